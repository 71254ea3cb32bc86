//! Zips y hashes para backups y paquetes de vehículos
//!
//! Todo lo de este módulo es E/S síncrona: llamarlo desde `run_blocking`.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::utils::errors::{internal_error, unprocessable_error, AppResult};

const HASH_CHUNK: usize = 1024 * 1024;

/// Ejecutar trabajo bloqueante fuera del runtime
pub async fn run_blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| internal_error(format!("Tarea bloqueante interrumpida: {}", e)))?
}

pub fn zip_error(e: ZipError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Ruta relativa segura de una entrada de zip.
///
/// `None` si es absoluta, lleva unidad de Windows o sube con `..`.
pub fn safe_archive_path(name: &str) -> Option<PathBuf> {
    let normalized = name.replace('\\', "/");
    if normalized.starts_with('/') || normalized.contains(':') {
        return None;
    }
    let mut path = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Comprimir `source` entero en `target`. Si `source` no existe el zip
/// queda vacío. Devuelve el número de ficheros añadidos.
pub fn zip_directory(source: &Path, target: &Path) -> io::Result<usize> {
    let mut writer = ZipWriter::new(File::create(target)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;
    if source.is_dir() {
        add_directory(&mut writer, source, source, options, &mut count)?;
    }
    writer.finish().map_err(zip_error)?;
    Ok(count)
}

fn add_directory<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    root: &Path,
    dir: &Path,
    options: FileOptions,
    count: &mut usize,
) -> io::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let name = archive_name(relative);
        if entry.file_type()?.is_dir() {
            writer.add_directory(format!("{}/", name), options).map_err(zip_error)?;
            add_directory(writer, root, &path, options, count)?;
        } else {
            writer.start_file(name, options).map_err(zip_error)?;
            io::copy(&mut File::open(&path)?, writer)?;
            *count += 1;
        }
    }
    Ok(())
}

/// Nombre de entrada con separadores `/`
pub fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Extraer un zip en `target` rechazando rutas que escapen del directorio
pub fn extract_archive<R: Read + Seek>(reader: R, target: &Path) -> AppResult<usize> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| unprocessable_error(&format!("Zip invalido: {}", e)))?;
    fs::create_dir_all(target)?;

    let mut count = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(zip_error)?;
        let relative = safe_archive_path(entry.name())
            .ok_or_else(|| unprocessable_error(&format!("Ruta no permitida en el zip: {}", entry.name())))?;
        let destination = target.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&destination)?;
            continue;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        io::copy(&mut entry, &mut File::create(&destination)?)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_safe_archive_path() {
        assert_eq!(
            safe_archive_path("vehicles/1234ABC/foto.jpg"),
            Some(PathBuf::from("vehicles/1234ABC/foto.jpg"))
        );
        assert_eq!(safe_archive_path("./a/b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(safe_archive_path("../etc/passwd"), None);
        assert_eq!(safe_archive_path("a/../../b"), None);
        assert_eq!(safe_archive_path("/etc/passwd"), None);
        assert_eq!(safe_archive_path("C:\\Windows\\x"), None);
        assert_eq!(safe_archive_path(""), None);
    }

    #[test]
    fn test_sha256_bytes() {
        assert_eq!(
            sha256_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_zip_and_extract_directory() {
        let source = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("vehicles/1234ABC")).unwrap();
        std::fs::write(source.path().join("vehicles/1234ABC/foto.jpg"), b"jpeg").unwrap();
        std::fs::write(source.path().join("leeme.txt"), b"hola").unwrap();

        let work = tempfile::tempdir().unwrap();
        let zip_path = work.path().join("storage.zip");
        assert_eq!(zip_directory(source.path(), &zip_path).unwrap(), 2);
        assert_eq!(sha256_file(&zip_path).unwrap().len(), 64);

        let target = work.path().join("out");
        let extracted = extract_archive(File::open(&zip_path).unwrap(), &target).unwrap();
        assert_eq!(extracted, 2);
        assert_eq!(std::fs::read(target.join("vehicles/1234ABC/foto.jpg")).unwrap(), b"jpeg");
    }

    #[test]
    fn test_zip_missing_directory_is_empty() {
        let work = tempfile::tempdir().unwrap();
        let zip_path = work.path().join("empty.zip");
        assert_eq!(zip_directory(&work.path().join("nope"), &zip_path).unwrap(), 0);
        assert!(zip_path.exists());
    }

    #[test]
    fn test_extract_rejects_zip_slip() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buffer);
            writer.start_file("../evil.txt", FileOptions::default()).unwrap();
            writer.write_all(b"x").unwrap();
            writer.finish().unwrap();
        }
        buffer.set_position(0);
        let target = tempfile::tempdir().unwrap();
        let err = extract_archive(buffer, target.path()).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
