//! Include/exclude decisions for entries found during the walk

use std::path::Path;

use glob::Pattern;
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, warn};

use crate::config::SummaryConfig;
use crate::error::Result;

use super::node::{EntryKind, RelPath};
use super::utils::{
    DEFAULT_IGNORED_NAMES, compile_patterns, extension_of, matches_any, normalize_extensions,
};

/// Decides whether an entry takes part in the walk.
///
/// Deny rules are applied before allow rules: default ignores, user globs,
/// hidden entries, then the extension deny and allow lists. `.gitignore`
/// rules depend on the directory being read, so the walker loads them per
/// directory with [`PathFilter::load_ignore_rules`] and applies them with
/// [`git_ignored`].
pub struct PathFilter {
    default_ignores: bool,
    deny: Vec<Pattern>,
    respect_gitignore: bool,
    include_hidden: bool,
    allow_extensions: Vec<String>,
    deny_extensions: Vec<String>,
}

impl PathFilter {
    /// Build the filter for a walk rooted at `root`.
    pub fn new(config: &SummaryConfig, root: &Path) -> Result<Self> {
        debug!(root = %root.display(), "building path filter");
        Ok(Self {
            default_ignores: config.default_ignores,
            deny: compile_patterns(&config.ignore_patterns)?,
            respect_gitignore: config.respect_gitignore,
            include_hidden: config.include_hidden,
            allow_extensions: normalize_extensions(&config.allow_extensions),
            deny_extensions: normalize_extensions(&config.deny_extensions),
        })
    }

    /// Check if an entry should be included. `kind` is the kind of the
    /// resolved target for symlinks.
    pub fn should_include(&self, rel_path: &RelPath, kind: EntryKind) -> bool {
        let Some(name) = rel_path.name() else {
            // The root itself is always included
            return true;
        };
        let is_dir = kind == EntryKind::Directory;

        if self.default_ignores && DEFAULT_IGNORED_NAMES.contains(&name) {
            return false;
        }

        if matches_any(&self.deny, rel_path) {
            return false;
        }

        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        if is_dir {
            return true;
        }

        let extension = extension_of(rel_path);
        if let Some(ext) = &extension {
            if self.deny_extensions.contains(ext) {
                return false;
            }
        }

        if !self.allow_extensions.is_empty() {
            return extension.is_some_and(|ext| self.allow_extensions.contains(&ext));
        }

        true
    }

    /// Ignore rules defined in directory `dir`: its `.gitignore` and, for
    /// the root, `.git/info/exclude`. `None` when there are none or
    /// gitignore handling is off.
    pub fn load_ignore_rules(&self, dir: &Path, is_root: bool) -> Option<Gitignore> {
        if !self.respect_gitignore {
            return None;
        }

        // Later files take precedence, matching git
        let mut sources = Vec::new();
        if is_root {
            sources.push(dir.join(".git").join("info").join("exclude"));
        }
        sources.push(dir.join(".gitignore"));
        sources.retain(|path| path.is_file());
        if sources.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(dir);
        for path in &sources {
            if let Some(err) = builder.add(path) {
                warn!(path = %path.display(), error = %err, "partially invalid ignore file");
            }
        }
        match builder.build() {
            Ok(gitignore) => {
                debug!(dir = %dir.display(), rules = gitignore.num_ignores(), "loaded ignore rules");
                Some(gitignore)
            }
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "ignoring unreadable ignore file");
                None
            }
        }
    }
}

/// Apply ignore rules from the nearest directory outwards. Each item pairs a
/// directory's rules with the entry's path relative to that directory; the
/// first rule set with an opinion decides.
pub fn git_ignored<'a, I>(rules: I, is_dir: bool) -> bool
where
    I: IntoIterator<Item = (&'a Gitignore, String)>,
{
    for (gitignore, relative) in rules {
        match gitignore.matched(Path::new(&relative), is_dir) {
            Match::Ignore(_) => return true,
            Match::Whitelist(_) => return false,
            Match::None => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn rel(path: &str) -> RelPath {
        path.split('/').collect()
    }

    fn filter_with(config: SummaryConfig, root: &Path) -> PathFilter {
        PathFilter::new(&config, root).unwrap()
    }

    #[test]
    fn test_default_ignores() {
        let dir = TempDir::new().unwrap();
        let filter = filter_with(SummaryConfig::default(), dir.path());

        assert!(!filter.should_include(&rel(".git"), EntryKind::Directory));
        assert!(!filter.should_include(&rel("web/node_modules"), EntryKind::Directory));
        assert!(filter.should_include(&rel("src"), EntryKind::Directory));
        assert!(filter.should_include(&rel("src/main.rs"), EntryKind::File));
    }

    #[test]
    fn test_git_ignored_even_when_hidden_included() {
        let dir = TempDir::new().unwrap();
        let config = SummaryConfig {
            include_hidden: true,
            ..Default::default()
        };
        let filter = filter_with(config, dir.path());

        assert!(!filter.should_include(&rel(".git"), EntryKind::Directory));
        assert!(filter.should_include(&rel(".github"), EntryKind::Directory));
    }

    #[test]
    fn test_default_ignores_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let config = SummaryConfig {
            default_ignores: false,
            ..Default::default()
        };
        let filter = filter_with(config, dir.path());
        assert!(filter.should_include(&rel("node_modules"), EntryKind::Directory));
    }

    #[test]
    fn test_hidden_entries() {
        let dir = TempDir::new().unwrap();
        let filter = filter_with(SummaryConfig::default(), dir.path());
        assert!(!filter.should_include(&rel(".env"), EntryKind::File));

        let config = SummaryConfig {
            include_hidden: true,
            ..Default::default()
        };
        let filter = filter_with(config, dir.path());
        assert!(filter.should_include(&rel(".env"), EntryKind::File));
    }

    #[test]
    fn test_user_ignore_patterns() {
        let dir = TempDir::new().unwrap();
        let config = SummaryConfig {
            ignore_patterns: vec!["*.log".to_string(), "build".to_string()],
            ..Default::default()
        };
        let filter = filter_with(config, dir.path());

        assert!(!filter.should_include(&rel("logs/app.log"), EntryKind::File));
        assert!(!filter.should_include(&rel("build"), EntryKind::Directory));
        assert!(filter.should_include(&rel("src/build.rs"), EntryKind::File));
    }

    fn ignored(rules: &Gitignore, relative: &str, is_dir: bool) -> bool {
        git_ignored([(rules, relative.to_string())], is_dir)
    }

    #[test]
    fn test_gitignore_rules() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.tmp\ndist/\n").unwrap();

        let filter = filter_with(SummaryConfig::default(), dir.path());
        let rules = filter.load_ignore_rules(dir.path(), true).unwrap();
        assert!(ignored(&rules, "scratch.tmp", false));
        assert!(ignored(&rules, "nested/scratch.tmp", false));
        assert!(ignored(&rules, "dist", true));
        assert!(!ignored(&rules, "dist", false));
        assert!(!ignored(&rules, "main.rs", false));

        let config = SummaryConfig {
            respect_gitignore: false,
            ..Default::default()
        };
        let filter = filter_with(config, dir.path());
        assert!(filter.load_ignore_rules(dir.path(), true).is_none());
    }

    #[test]
    fn test_no_ignore_file_means_no_rules() {
        let dir = TempDir::new().unwrap();
        let filter = filter_with(SummaryConfig::default(), dir.path());
        assert!(filter.load_ignore_rules(dir.path(), true).is_none());
    }

    #[test]
    fn test_git_info_exclude_only_at_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git/info")).unwrap();
        fs::write(dir.path().join(".git/info/exclude"), "secret.txt\n").unwrap();

        let filter = filter_with(SummaryConfig::default(), dir.path());
        let rules = filter.load_ignore_rules(dir.path(), true).unwrap();
        assert!(ignored(&rules, "secret.txt", false));
        assert!(filter.load_ignore_rules(dir.path(), false).is_none());
    }

    #[test]
    fn test_nearest_rules_win() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("web")).unwrap();
        fs::write(dir.path().join(".gitignore"), "*.js\n").unwrap();
        fs::write(dir.path().join("web/.gitignore"), "!keep.js\n").unwrap();

        let filter = filter_with(SummaryConfig::default(), dir.path());
        let root = filter.load_ignore_rules(dir.path(), true).unwrap();
        let web = filter.load_ignore_rules(&dir.path().join("web"), false).unwrap();

        let chain = |name: &str| {
            git_ignored(
                [(&web, name.to_string()), (&root, format!("web/{name}"))],
                false,
            )
        };
        assert!(!chain("keep.js"));
        assert!(chain("bundle.js"));
    }

    #[test]
    fn test_extension_lists_apply_to_files_only() {
        let dir = TempDir::new().unwrap();
        let config = SummaryConfig {
            allow_extensions: vec!["rs,toml".to_string()],
            deny_extensions: vec!["toml".to_string()],
            ..Default::default()
        };
        let filter = filter_with(config, dir.path());

        assert!(filter.should_include(&rel("src"), EntryKind::Directory));
        assert!(filter.should_include(&rel("src/lib.rs"), EntryKind::File));
        assert!(!filter.should_include(&rel("Cargo.toml"), EntryKind::File));
        assert!(!filter.should_include(&rel("README.md"), EntryKind::File));
        assert!(!filter.should_include(&rel("Makefile"), EntryKind::File));
    }

    #[test]
    fn test_deterministic() {
        let dir = TempDir::new().unwrap();
        let filter = filter_with(SummaryConfig::default(), dir.path());
        let path = rel("src/main.rs");
        let first = filter.should_include(&path, EntryKind::File);
        for _ in 0..10 {
            assert_eq!(filter.should_include(&path, EntryKind::File), first);
        }
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let dir = TempDir::new().unwrap();
        let config = SummaryConfig {
            ignore_patterns: vec!["[oops".to_string()],
            ..Default::default()
        };
        assert!(PathFilter::new(&config, dir.path()).is_err());
    }
}
