//! # Decodificação BMES → Palavras
//!
//! Máquina de estados que percorre a sequência de etiquetas da esquerda para a
//! direita e fecha cada palavra:
//!
//! - `B` ou `M`: abre uma palavra e avança até encontrar `E` (inclusivo) ou o fim
//!   da sequência. Uma corrida sem `E` é fechada no último índice, nunca descartada.
//! - `S`: palavra de um caractere.
//! - `E` sem palavra aberta: não deveria acontecer numa sequência bem formada,
//!   mas vira uma palavra de um caractere.
//!
//! Consequência: a concatenação das palavras é sempre o texto original.
//!
//! # Exemplo
//! `我 们 是 学 生` + `[B, E, S, B, E]` → `["我们", "是", "学生"]`

use std::ops::RangeInclusive;

use crate::error::{Result, SegError};
use crate::state::State;

/// Intervalos (em índices de caractere, inclusivos) de cada palavra.
pub fn word_boundaries(labels: &[State]) -> Vec<RangeInclusive<usize>> {
    let mut bounds = Vec::new();
    let mut i = 0;

    while i < labels.len() {
        if labels[i].opens_word() {
            let start = i;
            let mut cursor = i;
            while cursor < labels.len() && labels[cursor] != State::E {
                cursor += 1;
            }
            // Sem E até o fim: fecha no último caractere disponível
            let end = cursor.min(labels.len() - 1);
            bounds.push(start..=end);
            i = end + 1;
        } else {
            bounds.push(i..=i);
            i += 1;
        }
    }

    bounds
}

/// Converte etiquetas + texto em palavras.
///
/// # Erros
/// [`SegError::LengthMismatch`] se `text` não tiver exatamente um caractere por etiqueta.
pub fn segment(labels: &[State], text: &str) -> Result<Vec<String>> {
    let chars: Vec<char> = text.chars().collect();
    segment_chars(labels, &chars)
}

/// Igual a [`segment`], para quem já tem o texto como `&[char]`.
pub fn segment_chars(labels: &[State], chars: &[char]) -> Result<Vec<String>> {
    if labels.len() != chars.len() {
        return Err(SegError::LengthMismatch {
            labels: labels.len(),
            chars: chars.len(),
        });
    }

    Ok(word_boundaries(labels)
        .into_iter()
        .map(|range| chars[range].iter().collect())
        .collect())
}

/// Operação inversa: etiqueta uma frase já segmentada.
///
/// Palavra de um caractere → `S`; mais longa → `B M* E`. Palavras vazias são ignoradas.
pub fn tag_words(words: &[&str]) -> Vec<State> {
    let mut labels = Vec::new();
    for word in words {
        let n = word.chars().count();
        match n {
            0 => {}
            1 => labels.push(State::S),
            _ => {
                labels.push(State::B);
                labels.extend(std::iter::repeat(State::M).take(n - 2));
                labels.push(State::E);
            }
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use State::{B, E, M, S};

    #[test]
    fn test_begin_end_is_one_word() {
        assert_eq!(segment(&[B, E], "AB").unwrap(), vec!["AB"]);
    }

    #[test]
    fn test_all_singles() {
        assert_eq!(segment(&[S, S, S], "ABC").unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_begin_middle_end() {
        assert_eq!(segment(&[B, M, E], "ABC").unwrap(), vec!["ABC"]);
    }

    #[test]
    fn test_unterminated_run_closes_at_end() {
        assert_eq!(segment(&[B, B], "AB").unwrap(), vec!["AB"]);
        assert_eq!(segment(&[S, M], "AB").unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_orphan_end_is_single_char() {
        assert_eq!(segment(&[E, B, E], "ABC").unwrap(), vec!["A", "BC"]);
    }

    #[test]
    fn test_chinese_sentence() {
        let words = segment(&[B, E, S, B, E], "我们是学生").unwrap();
        assert_eq!(words, vec!["我们", "是", "学生"]);
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            segment(&[B, E], "ABC").unwrap_err(),
            SegError::LengthMismatch { labels: 2, chars: 3 }
        );
    }

    #[test]
    fn test_concatenation_preserves_text_for_every_label_sequence() {
        let text = "中华人民";
        // todas as 4^4 sequências de etiquetas, inclusive as malformadas
        for code in 0..256usize {
            let labels: Vec<State> = (0..4).map(|k| State::ALL[(code >> (2 * k)) & 3]).collect();
            let words = segment(&labels, text).unwrap();
            assert!(words.iter().all(|w| !w.is_empty()));
            assert_eq!(words.concat(), text);
        }
    }

    #[test]
    fn test_tag_words_round_trip() {
        let words = ["中华人民共和国", "成立", "了"];
        let labels = tag_words(&words);
        assert_eq!(labels.len(), 10);
        assert_eq!(segment(&labels, &words.concat()).unwrap(), words);
    }
}
