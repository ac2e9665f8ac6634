//! # Codificação de Caracteres em Símbolos
//!
//! O HMM não enxerga texto, apenas códigos inteiros. Cada caractere vira o seu
//! valor escalar Unicode, e o código precisa caber no alfabeto configurado no
//! modelo (por padrão os 65536 pontos do plano multilíngue básico).

use crate::error::{Result, SegError};

/// Tamanho padrão do alfabeto de observações.
pub const DEFAULT_ALPHABET_SIZE: usize = 65536;

/// Código inteiro de um caractere observado.
pub type Symbol = u32;

/// Valida que `symbol` cabe em `alphabet_size`.
///
/// `position` é apenas informativa e vai no erro para o chamador localizar o caractere.
pub fn check_symbol(symbol: Symbol, alphabet_size: usize, position: usize) -> Result<usize> {
    let index = symbol as usize;
    if index >= alphabet_size {
        return Err(SegError::OutOfRangeSymbol {
            position,
            symbol,
            alphabet_size,
        });
    }
    Ok(index)
}

/// Converte um caractere no seu código, verificando o limite do alfabeto.
pub fn encode_char(c: char, alphabet_size: usize, position: usize) -> Result<Symbol> {
    let symbol = c as Symbol;
    check_symbol(symbol, alphabet_size, position)?;
    Ok(symbol)
}

/// Converte um texto inteiro em códigos, um por caractere.
///
/// # Exemplo
/// ```rust
/// use hmmseg_core::symbol::{encode_text, DEFAULT_ALPHABET_SIZE};
///
/// let codes = encode_text("中国", DEFAULT_ALPHABET_SIZE).unwrap();
/// assert_eq!(codes, vec![0x4E2D, 0x56FD]);
/// ```
pub fn encode_text(text: &str, alphabet_size: usize) -> Result<Vec<Symbol>> {
    text.chars()
        .enumerate()
        .map(|(i, c)| encode_char(c, alphabet_size, i))
        .collect()
}
