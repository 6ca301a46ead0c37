// src/project/solution.rs

//! Solution file parsing
//!
//! Two formats are understood:
//! - `.sln` text solutions, one `Project(...)` line per project
//! - `.slnf` JSON solution filters naming a subset of a solution's projects
//!
//! The parser is chosen once from the file name with
//! [`select_solution_parser`] and handed to whoever needs it.

use crate::error::{Error, Result};
use crate::filesystem::path::absolutize;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Project type GUID Visual Studio uses for solution folders
const SOLUTION_FOLDER_TYPE: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

static PROJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^Project\("\{([0-9A-Fa-f-]+)\}"\)\s*=\s*"([^"]*)"\s*,\s*"([^"]*)"\s*,\s*"\{[0-9A-Fa-f-]+\}""#)
        .expect("project line pattern is valid")
});

/// One project listed by a solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectEntry {
    pub name: String,
    /// Absolute path of the project file
    pub path: PathBuf,
}

impl ProjectEntry {
    /// Directory containing the project file
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// A parsed solution: where it lives and which projects it lists
#[derive(Debug, Clone)]
pub struct SolutionDescriptor {
    pub path: PathBuf,
    pub projects: Vec<ProjectEntry>,
}

impl SolutionDescriptor {
    /// Directory containing the solution file
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Turns a solution file into its project list
pub trait SolutionParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<SolutionDescriptor>;
}

/// Parser for `.sln` text solutions
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSolutionParser;

impl TextSolutionParser {
    /// Parse solution text; project paths are resolved against `dir`
    pub fn parse_str(&self, content: &str, dir: &Path) -> Vec<ProjectEntry> {
        content
            .lines()
            .filter_map(|line| PROJECT_LINE.captures(line.trim()))
            .filter(|caps| !caps[1].eq_ignore_ascii_case(SOLUTION_FOLDER_TYPE))
            .filter(|caps| !caps[3].contains("://"))
            .map(|caps| ProjectEntry {
                name: caps[2].to_string(),
                path: absolutize(dir, &caps[3]),
            })
            .collect()
    }
}

impl SolutionParser for TextSolutionParser {
    fn parse(&self, path: &Path) -> Result<SolutionDescriptor> {
        let content = std::fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let projects = self.parse_str(&content, dir);
        debug!("Solution {} lists {} project(s)", path.display(), projects.len());

        Ok(SolutionDescriptor {
            path: path.to_path_buf(),
            projects,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FilterFile {
    solution: FilterSolution,
}

#[derive(Debug, Deserialize)]
struct FilterSolution {
    path: String,
    #[serde(default)]
    projects: Vec<String>,
}

/// Parser for `.slnf` solution filters
///
/// The filter's `solution.path` is resolved against the filter file, and its
/// project paths against that solution's directory. The returned descriptor
/// points at the underlying solution.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterSolutionParser;

impl SolutionParser for FilterSolutionParser {
    fn parse(&self, path: &Path) -> Result<SolutionDescriptor> {
        let content = std::fs::read_to_string(path)?;
        let filter: FilterFile = serde_json::from_str(&content).map_err(|e| Error::References {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let filter_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let solution_path = absolutize(filter_dir, &filter.solution.path);
        let solution_dir = solution_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| filter_dir.to_path_buf());

        let projects = filter
            .solution
            .projects
            .iter()
            .map(|p| {
                let path = absolutize(&solution_dir, p);
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.clone());
                ProjectEntry { name, path }
            })
            .collect();

        Ok(SolutionDescriptor {
            path: solution_path,
            projects,
        })
    }
}

/// Choose the parser for a solution file from its extension
pub fn select_solution_parser(path: &Path) -> Box<dyn SolutionParser> {
    let is_filter = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("slnf"));
    if is_filter {
        Box::new(FilterSolutionParser)
    } else {
        Box::new(TextSolutionParser)
    }
}
