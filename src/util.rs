use std::iter::repeat;
use std::path::{Path, PathBuf};

/// First of `subpaths` under `root` accepted by `search`.
pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(it))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_accepted_subpath() {
        let found = find_first_subpath("config", &["settings.yml", "settings.yaml"], |it| {
            it.extension().map_or(false, |ext| ext == "yaml")
        });
        assert_eq!(found, Some(PathBuf::from("config/settings.yaml")));

        assert_eq!(find_first_subpath("config", &["a", "b"], |_| false), None);
    }
}
