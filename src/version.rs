//! Build metadata baked in by `build.rs`.

use std::fmt;

const UNKNOWN: &str = "unknown";

/// Version and build details of this binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub git_version: &'static str,
    pub git_commit: &'static str,
    pub git_tree_state: &'static str,
    pub build_date: &'static str,
    pub rustc_version: &'static str,
    pub platform: &'static str,
}

pub fn get() -> Info {
    Info {
        git_version: concat!("v", env!("CARGO_PKG_VERSION")),
        git_commit: option_env!("HTTP_STAT_GIT_COMMIT").unwrap_or(UNKNOWN),
        git_tree_state: option_env!("HTTP_STAT_GIT_TREE_STATE").unwrap_or(UNKNOWN),
        build_date: option_env!("HTTP_STAT_BUILD_DATE").unwrap_or(UNKNOWN),
        rustc_version: option_env!("HTTP_STAT_RUSTC_VERSION").unwrap_or(UNKNOWN),
        platform: option_env!("HTTP_STAT_PLATFORM").unwrap_or(UNKNOWN),
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------------------------------")?;
        writeln!(f, "#   GitVersion: {}", self.git_version)?;
        writeln!(f, "#   GitCommit: {}", self.git_commit)?;
        writeln!(f, "#   GitTreeState: {}", self.git_tree_state)?;
        writeln!(f, "#   BuildDate: {}", self.build_date)?;
        writeln!(f, "#   RustcVersion: {}", self.rustc_version)?;
        writeln!(f, "#   Platform: {}", self.platform)?;
        write!(f, "----------------------------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_block() {
        let info = get();
        assert!(info.git_version.starts_with('v'));
        assert!(!info.platform.is_empty());

        let block = info.to_string();
        assert!(block.contains(&format!("#   GitCommit: {}", info.git_commit)));
        assert!(block.contains(&format!("#   Platform: {}", info.platform)));
        assert_eq!(block.lines().count(), 8);
    }
}
