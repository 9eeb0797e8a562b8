//! File access for source discovery, converted output and project scaffolding.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cyport_core::{Config, Error, LayoutMode, Result, SourceTest};
use tokio::fs::{create_dir_all, read_to_string, remove_file, write};
use tracing::{debug, info};
use walkdir::WalkDir;

/// File name suffix of Cypress tests.
pub const SOURCE_SUFFIX: &str = ".cy.ts";
/// File name suffix of converted Playwright tests.
pub const DESTINATION_SUFFIX: &str = ".spec.ts";

const PLAYWRIGHT_CONFIG: &str = r"import { defineConfig, devices } from '@playwright/test';

export default defineConfig({
  testDir: './tests',
  fullyParallel: true,
  forbidOnly: !!process.env.CI,
  retries: process.env.CI ? 2 : 0,
  workers: process.env.CI ? 1 : undefined,
  reporter: [['list'], ['json', { outputFile: 'test-results/results.json' }]],
  use: {
    baseURL: 'http://localhost:3000',
    trace: 'on-first-retry',
  },

  projects: [
    {
      name: 'chromium',
      use: { ...devices['Desktop Chrome'] },
    },
  ],
});
";

const TEST_FIXTURE: &str = r"import { test as base } from '@playwright/test';

interface TestFixtures {
  // Add your fixture types here
}

export const test = base.extend<TestFixtures>({
  // Add your fixtures here
});

export { expect } from '@playwright/test';
";

const PACKAGE_JSON: &str = r#"{
  "name": "playwright-tests",
  "version": "1.0.0",
  "description": "Playwright tests converted from Cypress",
  "scripts": {
    "test": "playwright test",
    "test:headed": "playwright test --headed",
    "test:ui": "playwright test --ui",
    "report": "playwright show-report"
  },
  "dependencies": {
    "@playwright/test": "^1.42.1"
  }
}
"#;

/// Files written by [`FileHandler::scaffold_project`], relative to the project root.
pub const SCAFFOLD_FILES: [(&str, &str); 3] = [
    ("playwright.config.ts", PLAYWRIGHT_CONFIG),
    ("tests/fixtures/test.ts", TEST_FIXTURE),
    ("package.json", PACKAGE_JSON),
];

/// Filesystem operations used by the conversion pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileHandler;

impl FileHandler {
    /// Reads a UTF-8 text file.
    ///
    /// # Errors
    /// Returns [`Error::Io`] naming `path` if the file cannot be read.
    pub async fn read(path: &Path) -> Result<String> {
        read_to_string(path)
            .await
            .map_err(|err| Error::io("read", path, err))
    }

    /// Reads a discovered source test.
    ///
    /// # Errors
    /// Returns [`Error::Io`] naming `path` if the file cannot be read.
    pub async fn read_source(path: &Path) -> Result<SourceTest> {
        Ok(SourceTest {
            path: path.to_path_buf(),
            content: Self::read(path).await?,
        })
    }

    /// Writes `content` to `path`, creating missing parent directories.
    ///
    /// # Errors
    /// Returns [`Error::Io`] naming the path that could not be created or written.
    pub async fn write(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            create_dir_all(parent)
                .await
                .map_err(|err| Error::io("create directory", parent, err))?;
        }
        write(path, content)
            .await
            .map_err(|err| Error::io("write", path, err))
    }

    /// Deletes a file. A file that does not exist is not an error.
    ///
    /// # Errors
    /// Returns [`Error::Io`] for any failure other than the file being absent.
    pub async fn delete(path: &Path) -> Result<()> {
        match remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("Nothing to delete at {}", path.display());
                Ok(())
            }
            Err(err) => Err(Error::io("delete", path, err)),
        }
    }

    /// Recursively finds every Cypress test under `root`, sorted by file name within each directory.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if `root` or one of its subdirectories cannot be listed.
    pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|err| Error::io("list", root, err.into()))?;
            let is_source = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(SOURCE_SUFFIX));
            if entry.file_type().is_file() && is_source {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Writes the Playwright config, fixture stub and manifest under `root`.
    ///
    /// Every file is fully overwritten, so repeated calls leave identical content.
    ///
    /// # Errors
    /// Returns [`Error::Io`] naming the first file that could not be written.
    pub async fn scaffold_project(root: &Path) -> Result<()> {
        info!("Setting up Playwright project structure in {}", root.display());
        for (relative, content) in SCAFFOLD_FILES {
            Self::write(&root.join(relative), content).await?;
        }
        info!("Playwright project setup complete");
        Ok(())
    }

    /// Primary destination of a converted source test.
    ///
    /// The `.cy.ts` suffix becomes `.spec.ts`. In flat layout only the file
    /// name is kept; in preserve layout the path relative to the source root is.
    #[must_use]
    pub fn destination_for(source: &Path, config: &Config) -> PathBuf {
        let relative = match config.layout {
            LayoutMode::Preserve => source.strip_prefix(&config.source_dir).ok(),
            LayoutMode::Flat => None,
        }
        .map(Path::to_path_buf)
        .or_else(|| source.file_name().map(PathBuf::from))
        .unwrap_or_default();

        config.destination_dir.join(rename_to_destination(&relative))
    }

    /// Quarantine location of a converted test.
    ///
    /// The path below the destination root is kept under `<destination>/flaky`,
    /// so distinct destinations never share a quarantine file.
    #[must_use]
    pub fn flaky_path_for(destination: &Path, config: &Config) -> PathBuf {
        let flaky_dir = config.flaky_dir();
        let relative = destination
            .strip_prefix(&config.destination_dir)
            .ok()
            .map(Path::to_path_buf)
            .or_else(|| destination.file_name().map(PathBuf::from))
            .unwrap_or_default();
        flaky_dir.join(relative)
    }
}

fn rename_to_destination(path: &Path) -> PathBuf {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return path.to_path_buf();
    };
    let renamed = name
        .strip_suffix(SOURCE_SUFFIX)
        .map_or_else(|| name.to_owned(), |stem| format!("{stem}{DESTINATION_SUFFIX}"));
    path.with_file_name(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(temp: &TempDir) -> Config {
        Config::new(
            temp.path().join("cypress"),
            temp.path().join("playwright/tests"),
            temp.path().join("playwright"),
            "sk-test",
        )
    }

    #[tokio::test]
    async fn test_write_creates_parents_and_overwrites() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("a/b/c.spec.ts");

        FileHandler::write(&path, "first").await.expect("first write");
        FileHandler::write(&path, "second").await.expect("second write");

        assert_eq!(FileHandler::read(&path).await.expect("read"), "second");
    }

    #[tokio::test]
    async fn test_read_missing_file_names_path() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("missing.cy.ts");

        let err = FileHandler::read(&path).await.expect_err("should fail");
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("missing.cy.ts"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("gone.spec.ts");
        fs::write(&path, "x").expect("Failed to write");

        FileHandler::delete(&path).await.expect("first delete");
        assert!(!path.exists());
        FileHandler::delete(&path).await.expect("second delete");
    }

    #[tokio::test]
    async fn test_delete_directory_is_an_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let result = FileHandler::delete(temp.path()).await;
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_discover_finds_nested_cypress_tests_only() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path();
        fs::create_dir_all(root.join("nested/deeper")).expect("Failed to create dirs");
        fs::write(root.join("a.cy.ts"), "").expect("write a");
        fs::write(root.join("nested/b.cy.ts"), "").expect("write b");
        fs::write(root.join("nested/deeper/c.cy.ts"), "").expect("write c");
        fs::write(root.join("helper.ts"), "").expect("write helper");
        fs::write(root.join("nested/readme.md"), "").expect("write readme");
        fs::write(root.join("nested/d.spec.ts"), "").expect("write spec");

        let mut found: Vec<String> = FileHandler::discover(root)
            .expect("discover")
            .iter()
            .filter_map(|path| path.file_name()?.to_str().map(str::to_owned))
            .collect();
        found.sort();

        assert_eq!(found, vec!["a.cy.ts", "b.cy.ts", "c.cy.ts"]);
    }

    #[test]
    fn test_discover_missing_root_is_an_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let result = FileHandler::discover(&temp.path().join("nope"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[tokio::test]
    async fn test_scaffold_is_idempotent() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().join("project");

        FileHandler::scaffold_project(&root).await.expect("first scaffold");
        let first: Vec<String> = SCAFFOLD_FILES
            .iter()
            .map(|(relative, _)| fs::read_to_string(root.join(relative)).expect("read"))
            .collect();

        FileHandler::scaffold_project(&root).await.expect("second scaffold");
        let second: Vec<String> = SCAFFOLD_FILES
            .iter()
            .map(|(relative, _)| fs::read_to_string(root.join(relative)).expect("read"))
            .collect();

        assert_eq!(first, second);
        assert!(first[0].contains("test-results/results.json"));
    }

    #[test]
    fn test_destination_flat_layout() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let config = config_for(&temp);
        let source = config.source_dir.join("nested/login.cy.ts");

        assert_eq!(
            FileHandler::destination_for(&source, &config),
            config.destination_dir.join("login.spec.ts")
        );
    }

    #[test]
    fn test_destination_preserve_layout() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let config = config_for(&temp).with_layout(LayoutMode::Preserve);
        let source = config.source_dir.join("nested/login.cy.ts");

        assert_eq!(
            FileHandler::destination_for(&source, &config),
            config.destination_dir.join("nested/login.spec.ts")
        );
    }

    #[test]
    fn test_flaky_path_flat_layout() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let config = config_for(&temp);
        let destination = config.destination_dir.join("login.spec.ts");

        assert_eq!(
            FileHandler::flaky_path_for(&destination, &config),
            config.destination_dir.join("flaky/login.spec.ts")
        );
    }

    #[test]
    fn test_flaky_path_mirrors_destination_layout() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let config = config_for(&temp).with_layout(LayoutMode::Preserve);
        let admin = FileHandler::destination_for(&config.source_dir.join("admin/login.cy.ts"), &config);
        let shop = FileHandler::destination_for(&config.source_dir.join("shop/login.cy.ts"), &config);

        let admin_flaky = FileHandler::flaky_path_for(&admin, &config);
        let shop_flaky = FileHandler::flaky_path_for(&shop, &config);

        assert_eq!(admin_flaky, config.destination_dir.join("flaky/admin/login.spec.ts"));
        assert_ne!(admin_flaky, shop_flaky);
    }
}
