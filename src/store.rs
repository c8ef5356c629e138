use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// On-disk mirror of solution text, one file per solution.
//
// The database stays the source of truth; the store exists so solutions can
// be opened in an editor or fed straight to the code runner.
pub struct SolutionStore {
    base_path: PathBuf,
}

impl SolutionStore {
    pub fn open<P: AsRef<Path>>(base_path: P) -> io::Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn save(&self, solution_id: i64, language: &str, code: &str) -> io::Result<PathBuf> {
        let path = self.file_path(solution_id, language);
        fs::write(&path, code)?;
        Ok(path)
    }

    pub fn load(&self, solution_id: i64, language: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.file_path(solution_id, language)) {
            Ok(code) => Ok(Some(code)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    // Missing files are fine; the mirror may never have been written.
    pub fn delete(&self, solution_id: i64, language: &str) -> io::Result<()> {
        match fs::remove_file(self.file_path(solution_id, language)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn file_path(&self, solution_id: i64, language: &str) -> PathBuf {
        self.base_path
            .join(format!("solution_{}.{}", solution_id, file_extension(language)))
    }
}

fn file_extension(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "python" => "py",
        "javascript" => "js",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "rust" => "rs",
        "rhai" => "rhai",
        _ => "txt",
    }
}
