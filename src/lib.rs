pub mod application;
pub mod archive;
pub mod catalog;
pub mod cleanup;
pub mod commands;
pub mod deploy;
pub mod error;
pub mod http;
pub mod package;
pub mod profile;
pub mod resolver;
pub mod runtime;

/// Fixtures shared by unit tests.
#[cfg(test)]
pub mod test_utils {
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, SystemTime};
    use zip::write::SimpleFileOptions;

    /// Write a zip archive holding `files` (path inside the archive, content).
    /// Paths ending in `/` become directory entries.
    pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, content) in files {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    pub fn manifest_json(name: &str, version: &str, dependencies: &[&str]) -> String {
        serde_json::json!({
            "name": name,
            "version_number": version,
            "website_url": "",
            "description": format!("{} for tests", name),
            "dependencies": dependencies,
        })
        .to_string()
    }

    /// `<dir>/<owner>-<name>-<version>.zip` with a manifest and one plugin file.
    pub fn write_package_zip(
        dir: &Path,
        owner: &str,
        name: &str,
        version: &str,
        dependencies: &[&str],
    ) -> PathBuf {
        let path = dir.join(format!("{}-{}-{}.zip", owner, name, version));
        let manifest = manifest_json(name, version, dependencies);
        let plugin = format!("{}.dll", name);
        write_zip(
            &path,
            &[
                ("manifest.json", manifest.as_bytes()),
                (plugin.as_str(), version.as_bytes()),
            ],
        );
        path
    }

    /// Set the last-write time of `path` to `age` before now.
    pub fn set_age(path: &Path, age: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }
}
