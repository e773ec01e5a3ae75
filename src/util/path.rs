use std::path::{Path, PathBuf};

use tracing::warn;

pub trait PathExt {
    /// File name without directory and extension: the key used for reports and annotations.
    fn result_key(&self) -> String;
    /// Expand `~` and `$VAR`; unresolvable variables leave the path unchanged.
    fn expand(&self) -> PathBuf;
}

impl PathExt for Path {
    fn result_key(&self) -> String {
        self.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.to_string_lossy().into_owned())
    }

    fn expand(&self) -> PathBuf {
        let raw = self.to_string_lossy();
        match shellexpand::full(&raw) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                warn!("cannot expand {}: {}", raw, e);
                self.to_path_buf()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("data/gene1.json", "gene1")]
    #[case("gene1", "gene1")]
    #[case("/abs/dir/BUSCO_12.absrel.json", "BUSCO_12.absrel")]
    fn given_result_path_when_deriving_key_then_strips_dir_and_extension(
        #[case] path: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(Path::new(path).result_key(), expected);
    }

    #[test]
    fn given_tilde_when_expanding_then_uses_home() {
        let home = std::env::var("HOME").expect("HOME should be set");
        assert_eq!(Path::new("~/x.tsv").expand(), Path::new(&home).join("x.tsv"));
    }

    #[test]
    fn given_unknown_variable_when_expanding_then_keeps_path() {
        let path = Path::new("$CATFISH_SURELY_UNSET_VARIABLE/x");
        assert_eq!(path.expand(), path.to_path_buf());
    }
}
