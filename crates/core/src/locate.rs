//! Working-directory resolution for a run.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocateError {
    #[error("{file:?} not found in {dir:?}; pass --lab, --uid and --year to locate the OOT folder")]
    TraceNotFound { file: String, dir: PathBuf },

    #[error("Cannot derive a UID from {0:?}")]
    NoUid(PathBuf),
}

/// Where the OOT folder lives when it is not the current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRequest {
    pub lab: String,
    pub uid: String,
    pub year: i32,
}

impl SiteRequest {
    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(self.year.to_string()).join(&self.lab).join(&self.uid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDir {
    pub dir: PathBuf,
    pub uid: String,
    /// The folder does not exist yet and should be created by the caller.
    pub create: bool,
}

/// Decide which directory a run works in.
///
/// A directory already holding the Reverse Trace wins, and its name is the
/// UID unless a request names one explicitly. Otherwise a site request
/// resolves `<root>/<year>/<lab>/<uid>`.
pub fn resolve(
    dir: &Path,
    trace_file: &str,
    trace_in_dir: bool,
    request: Option<&SiteRequest>,
    root: &Path,
    site_exists: impl Fn(&Path) -> bool,
) -> Result<WorkingDir, LocateError> {
    if trace_in_dir {
        let uid = match request {
            Some(request) => {
                if uid_from_dir(dir).as_deref() != Some(request.uid.as_str()) {
                    log::warn!(
                        "using UID {:?} instead of the name of {}",
                        request.uid,
                        dir.display()
                    );
                }
                request.uid.clone()
            }
            None => uid_from_dir(dir).ok_or_else(|| LocateError::NoUid(dir.to_path_buf()))?,
        };
        return Ok(WorkingDir {
            dir: dir.to_path_buf(),
            uid,
            create: false,
        });
    }

    match request {
        Some(request) => {
            let site = request.path(root);
            let create = !site_exists(&site);
            Ok(WorkingDir {
                dir: site,
                uid: request.uid.clone(),
                create,
            })
        }
        None => Err(LocateError::TraceNotFound {
            file: trace_file.to_string(),
            dir: dir.to_path_buf(),
        }),
    }
}

pub fn uid_from_dir(dir: &Path) -> Option<String> {
    dir.file_name()
        .map(|n| n.to_string_lossy().trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_in_dir_uses_dir_name() {
        let wd = resolve(
            Path::new("/oots/2024/LabA/U-42"),
            "Reverse Trace.xlsx",
            true,
            None,
            Path::new("/oots"),
            |_| false,
        )
        .unwrap();
        assert_eq!(wd.uid, "U-42");
        assert!(!wd.create);
    }

    #[test]
    fn site_request_builds_tree_path() {
        let request = SiteRequest {
            lab: "LabA".into(),
            uid: "U-7".into(),
            year: 2024,
        };
        let wd = resolve(
            Path::new("/tmp"),
            "Reverse Trace.xlsx",
            false,
            Some(&request),
            Path::new("/oots"),
            |_| false,
        )
        .unwrap();
        assert_eq!(wd.dir, PathBuf::from("/oots/2024/LabA/U-7"));
        assert_eq!(wd.uid, "U-7");
        assert!(wd.create);
    }

    #[test]
    fn existing_site_is_not_recreated() {
        let request = SiteRequest {
            lab: "LabA".into(),
            uid: "U-7".into(),
            year: 2024,
        };
        let wd = resolve(
            Path::new("/tmp"),
            "Reverse Trace.xlsx",
            false,
            Some(&request),
            Path::new("/oots"),
            |_| true,
        )
        .unwrap();
        assert!(!wd.create);
    }

    #[test]
    fn missing_trace_without_request_errors() {
        let err = resolve(
            Path::new("/tmp/x"),
            "Reverse Trace.xlsx",
            false,
            None,
            Path::new("/oots"),
            |_| true,
        )
        .unwrap_err();
        assert!(matches!(err, LocateError::TraceNotFound { .. }));
    }

    #[test]
    fn root_has_no_uid() {
        let err = resolve(Path::new("/"), "t", true, None, Path::new("/"), |_| true).unwrap_err();
        assert_eq!(err, LocateError::NoUid(PathBuf::from("/")));
    }

    #[test]
    fn explicit_uid_wins_over_dir_name() {
        let request = SiteRequest {
            lab: "LabA".into(),
            uid: "U-7".into(),
            year: 2024,
        };
        let wd = resolve(
            Path::new("/work/scratch"),
            "Reverse Trace.xlsx",
            true,
            Some(&request),
            Path::new("/oots"),
            |_| false,
        )
        .unwrap();
        assert_eq!(wd.dir, PathBuf::from("/work/scratch"));
        assert_eq!(wd.uid, "U-7");
        assert!(!wd.create);
    }
}
