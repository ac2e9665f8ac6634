//! # Corpus Rotulado com Etiquetas BMES
//!
//! Um corpus é uma lista ordenada de pares (observações, rótulos) mais um escalar
//! `total_sequence_count`, usado como denominador da distribuição inicial.
//!
//! ## Formato tabulado
//!
//! O formato aceito por [`parse_tagged_corpus`] é o mesmo dos corpora de treino
//! de CRF para segmentação (ex: PKU): um caractere e sua etiqueta por linha,
//! separados por TAB. Linhas em branco separam sequências; um arquivo sem linhas
//! em branco vira uma única sequência gigante.
//!
//! ```text
//! 我	B
//! 们	E
//! 是	S
//! ```
//!
//! Este módulo não lê arquivos: quem chama entrega o conteúdo já em memória.

use crate::error::{Result, SegError};
use crate::segment::tag_words;
use crate::state::State;
use crate::symbol::{encode_char, encode_text, Symbol};

/// Um par alinhado (observações, rótulos).
///
/// A construção não valida os tamanhos: o estimador rejeita pares malformados
/// antes de contar qualquer coisa deles.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSequence {
    pub observations: Vec<Symbol>,
    pub labels: Vec<State>,
}

impl LabeledSequence {
    pub fn new(observations: Vec<Symbol>, labels: Vec<State>) -> Self {
        Self { observations, labels }
    }

    /// Constrói a partir de rótulos numéricos 0..=3.
    pub fn from_indices(observations: Vec<Symbol>, labels: &[usize]) -> Result<Self> {
        let labels = labels
            .iter()
            .map(|&i| State::from_index(i))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(observations, labels))
    }

    /// Constrói a partir de uma frase já segmentada (ex: `["我们", "是", "学生"]`).
    pub fn from_words(words: &[&str], alphabet_size: usize) -> Result<Self> {
        let text: String = words.concat();
        let observations = encode_text(&text, alphabet_size)?;
        Ok(Self::new(observations, tag_words(words)))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Corpus de treino: sequências + contagem total de sequências.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    sequences: Vec<LabeledSequence>,
    total_sequence_count: usize,
}

impl Corpus {
    /// Cria o corpus; a contagem de sequências é o número de pares.
    pub fn new(sequences: Vec<LabeledSequence>) -> Self {
        let total_sequence_count = sequences.len();
        Self {
            sequences,
            total_sequence_count,
        }
    }

    /// Sobrescreve o denominador da distribuição inicial.
    pub fn with_sequence_count(mut self, total_sequence_count: usize) -> Self {
        self.total_sequence_count = total_sequence_count;
        self
    }

    /// Constrói a partir de frases segmentadas.
    pub fn from_segmented(sentences: &[&[&str]], alphabet_size: usize) -> Result<Self> {
        let sequences = sentences
            .iter()
            .map(|words| LabeledSequence::from_words(words, alphabet_size))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(sequences))
    }

    pub fn sequences(&self) -> &[LabeledSequence] {
        &self.sequences
    }

    pub fn total_sequence_count(&self) -> usize {
        self.total_sequence_count
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Total de caracteres rotulados.
    pub fn total_chars(&self) -> usize {
        self.sequences.iter().map(|s| s.len()).sum()
    }
}

/// Parseia um corpus no formato `caractere<TAB>etiqueta`.
///
/// Números de linha nos erros começam em 1.
pub fn parse_tagged_corpus(input: &str, alphabet_size: usize) -> Result<Corpus> {
    let mut sequences = Vec::new();
    let mut observations = Vec::new();
    let mut labels = Vec::new();

    for (i, raw) in input.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim_end_matches('\r');

        if line.trim().is_empty() {
            if !observations.is_empty() {
                sequences.push(LabeledSequence::new(
                    std::mem::take(&mut observations),
                    std::mem::take(&mut labels),
                ));
            }
            continue;
        }

        let (ch, tag) = line.split_once('\t').ok_or_else(|| SegError::CorpusFormat {
            line: line_no,
            reason: "esperado 'caractere<TAB>etiqueta'".into(),
        })?;

        let mut chars = ch.chars();
        let c = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(SegError::CorpusFormat {
                    line: line_no,
                    reason: format!("esperado um único caractere, encontrado {:?}", ch),
                })
            }
        };

        let state = State::from_label(tag.trim()).map_err(|e| SegError::CorpusFormat {
            line: line_no,
            reason: e.to_string(),
        })?;
        let symbol =
            encode_char(c, alphabet_size, observations.len()).map_err(|e| SegError::CorpusFormat {
                line: line_no,
                reason: e.to_string(),
            })?;

        observations.push(symbol);
        labels.push(state);
    }

    if !observations.is_empty() {
        sequences.push(LabeledSequence::new(observations, labels));
    }
    if sequences.is_empty() {
        return Err(SegError::EmptyCorpus);
    }

    Ok(Corpus::new(sequences))
}

/// Frases segmentadas à mão para demonstração e testes.
const DEMO_SENTENCES: &[&[&str]] = &[
    &["我们", "是", "学生"],
    &["我", "爱", "北京", "天安门"],
    &["今天", "天气", "很", "好"],
    &["他", "是", "一个", "好", "老师"],
    &["中华人民共和国", "成立", "了"],
    &["北京", "是", "中国", "的", "首都"],
    &["我们", "在", "学校", "学习", "中文"],
    &["老师", "和", "学生", "都", "很", "高兴"],
    &["明天", "我", "去", "北京", "大学"],
    &["这", "是", "一个", "很", "好", "的", "问题"],
    &["中国", "人民", "热爱", "和平"],
    &["他们", "在", "公园", "里", "散步"],
    &["我", "喜欢", "看", "书"],
    &["学生", "们", "在", "教室", "里", "读书"],
    &["今天", "我们", "学习", "汉语"],
    &["她", "是", "我", "的", "朋友"],
    &["上海", "是", "一个", "大", "城市"],
    &["我们", "的", "老师", "非常", "认真"],
    &["天气", "预报", "说", "明天", "下雨"],
    &["人民", "大会堂", "在", "天安门", "广场", "西侧"],
];

/// Corpus de demonstração embutido.
pub fn demo_corpus(alphabet_size: usize) -> Result<Corpus> {
    Corpus::from_segmented(DEMO_SENTENCES, alphabet_size)
}

/// Textos não segmentados para a interface de demonstração: (origem, texto).
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        ("treino", "我们是学生"),
        ("treino", "北京是中国的首都"),
        ("novo", "我们在北京学习"),
        ("novo", "老师喜欢看书"),
        ("novo", "今天的天气非常好"),
        ("novo", "中国人民在天安门广场"),
    ]
}
