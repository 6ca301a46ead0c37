// src/project/discovery.rs

//! Locating the solution to restore and the scopes it contains

use super::solution::SolutionDescriptor;
use crate::error::{Error, Result};
use crate::reference::Scope;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default references file name for a project
pub const PACKAGES_CONFIG: &str = "packages.config";

/// Directory holding solution-level references
pub const SOLUTION_CONFIG_DIR: &str = ".nuget";

/// Find the solution file for `path`
///
/// A file path is taken as-is. A directory must contain exactly one `.sln`
/// file: none is `Error::SolutionNotFound`, several is
/// `Error::AmbiguousSolution`.
pub fn discover_solution(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        return Err(Error::SolutionNotFound(path.to_path_buf()));
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("sln")))
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(Error::SolutionNotFound(path.to_path_buf())),
        1 => {
            let solution = candidates.remove(0);
            debug!("Using solution {}", solution.display());
            Ok(solution)
        }
        _ => Err(Error::AmbiguousSolution {
            dir: path.to_path_buf(),
            candidates,
        }),
    }
}

/// References file for a project directory
///
/// `packages.<project>.config` wins over `packages.config` when it exists.
pub fn project_references_file(project_dir: &Path, project_name: &str) -> PathBuf {
    let specific = project_dir.join(format!("packages.{}.config", project_name.replace(' ', "_")));
    if specific.is_file() {
        specific
    } else {
        project_dir.join(PACKAGES_CONFIG)
    }
}

/// Scopes of a solution in restore order
///
/// The solution-level `.nuget/packages.config` comes first when present,
/// followed by every project in solution order.
pub fn solution_scopes(solution: &SolutionDescriptor) -> Vec<Scope> {
    let mut scopes = Vec::with_capacity(solution.projects.len() + 1);

    let solution_file = solution
        .directory()
        .join(SOLUTION_CONFIG_DIR)
        .join(PACKAGES_CONFIG);
    if solution_file.is_file() {
        let name = solution
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "solution".to_string());
        scopes.push(Scope::new(name, solution_file));
    }

    for project in &solution.projects {
        scopes.push(Scope::new(
            project.name.clone(),
            project_references_file(project.directory(), &project.name),
        ));
    }

    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::solution::ProjectEntry;
    use tempfile::TempDir;

    #[test]
    fn test_discovery_counts() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            discover_solution(temp.path()),
            Err(Error::SolutionNotFound(_))
        ));

        std::fs::write(temp.path().join("One.sln"), "").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "").unwrap();
        assert_eq!(
            discover_solution(temp.path()).unwrap(),
            temp.path().join("One.sln")
        );

        std::fs::write(temp.path().join("Two.SLN"), "").unwrap();
        let err = discover_solution(temp.path()).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, Error::AmbiguousSolution { ref candidates, .. } if candidates.len() == 2));
    }

    #[test]
    fn test_explicit_file_and_missing_path() {
        let temp = TempDir::new().unwrap();
        let sln = temp.path().join("App.sln");
        std::fs::write(&sln, "").unwrap();
        assert_eq!(discover_solution(&sln).unwrap(), sln);
        assert!(matches!(
            discover_solution(&temp.path().join("nope")),
            Err(Error::SolutionNotFound(_))
        ));
    }

    #[test]
    fn test_solution_scopes_order_and_file_choice() {
        let temp = TempDir::new().unwrap();
        let nuget = temp.path().join(SOLUTION_CONFIG_DIR);
        std::fs::create_dir_all(&nuget).unwrap();
        std::fs::write(nuget.join(PACKAGES_CONFIG), "<packages/>").unwrap();

        let app = temp.path().join("App");
        let lib = temp.path().join("Lib");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(lib.join("packages.Lib.config"), "<packages/>").unwrap();

        let solution = SolutionDescriptor {
            path: temp.path().join("All.sln"),
            projects: vec![
                ProjectEntry {
                    name: "App".to_string(),
                    path: app.join("App.csproj"),
                },
                ProjectEntry {
                    name: "Lib".to_string(),
                    path: lib.join("Lib.csproj"),
                },
            ],
        };

        let scopes = solution_scopes(&solution);
        let names: Vec<_> = scopes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["All.sln", "App", "Lib"]);
        assert_eq!(scopes[1].references_file, app.join(PACKAGES_CONFIG));
        assert_eq!(scopes[2].references_file, lib.join("packages.Lib.config"));
    }
}
