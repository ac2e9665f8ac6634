//! Configuração do servidor via variáveis de ambiente.
//!
//! | Variável          | Padrão         | Uso                                          |
//! |-------------------|----------------|----------------------------------------------|
//! | `HMMSEG_BIND`     | `0.0.0.0:3000` | endereço de escuta                           |
//! | `HMMSEG_CORPUS`   | (vazio)        | corpus `caractere<TAB>etiqueta`; sem ele usa o corpus de demonstração |
//! | `HMMSEG_ALPHABET` | `65536`        | tamanho do alfabeto de símbolos              |
//!
//! O nível de log segue `RUST_LOG` (padrão `info`).

use std::path::PathBuf;

use hmmseg_core::corpus::{demo_corpus, parse_tagged_corpus, Corpus};
use hmmseg_core::{SegError, DEFAULT_ALPHABET_SIZE};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} inválido: {value:?}")]
    InvalidVar { var: &'static str, value: String },

    #[error("falha ao ler corpus {path:?}: {source}")]
    CorpusIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corpus inválido: {0}")]
    Corpus(#[from] SegError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub corpus_path: Option<PathBuf>,
    pub alphabet_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            corpus_path: None,
            alphabet_size: DEFAULT_ALPHABET_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de consulta (testável sem
    /// mexer no ambiente).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(bind) = lookup("HMMSEG_BIND").filter(|v| !v.trim().is_empty()) {
            config.bind = bind.trim().to_string();
        }
        if let Some(path) = lookup("HMMSEG_CORPUS").filter(|v| !v.trim().is_empty()) {
            config.corpus_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(raw) = lookup("HMMSEG_ALPHABET") {
            config.alphabet_size = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        var: "HMMSEG_ALPHABET",
                        value: raw,
                    })
                }
            };
        }

        Ok(config)
    }

    /// Carrega o corpus configurado (arquivo ou demonstração).
    pub fn load_corpus(&self) -> Result<Corpus, ConfigError> {
        match &self.corpus_path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::CorpusIo {
                        path: path.clone(),
                        source,
                    })?;
                Ok(parse_tagged_corpus(&content, self.alphabet_size)?)
            }
            None => Ok(demo_corpus(self.alphabet_size)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert!(!config.load_corpus().unwrap().is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HMMSEG_BIND", "127.0.0.1:8080"),
            ("HMMSEG_CORPUS", "/tmp/pku.utf8"),
            ("HMMSEG_ALPHABET", "1024"),
        ]))
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.corpus_path, Some(PathBuf::from("/tmp/pku.utf8")));
        assert_eq!(config.alphabet_size, 1024);
    }

    #[test]
    fn test_invalid_alphabet() {
        for bad in ["zero", "0", "-3"] {
            let err =
                ServerConfig::from_lookup(lookup_from(&[("HMMSEG_ALPHABET", bad)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidVar { var: "HMMSEG_ALPHABET", .. }));
        }
    }

    #[test]
    fn test_missing_corpus_file() {
        let config = ServerConfig {
            corpus_path: Some(PathBuf::from("/nonexistent/hmmseg/corpus.utf8")),
            ..ServerConfig::default()
        };
        assert!(matches!(config.load_corpus(), Err(ConfigError::CorpusIo { .. })));
    }
}
