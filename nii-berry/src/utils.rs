//! 路径工具.

use crate::consts::DEFAULT_NII_PATTERN;
use crate::{DatasetError, DatasetResult};
use glob::MatchOptions;
use log::debug;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// 把文件名拆成 (主干, 扩展名). 扩展名从最后一个 `.` 开始;
/// 文件名开头的 `.` 不算扩展名的开始 (例如 `.bashrc` 没有扩展名).
fn splitext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if name[..i].chars().any(|c| c != '.') => (&name[..i], &name[i..]),
        _ => (name, ""),
    }
}

/// 把路径拆成 (目录, 文件主干, 扩展名).
///
/// 压缩后缀 `.gz` 会与内层扩展名合并, 例如 `a/b/foo.nii.gz` 得到
/// `("a/b", "foo", ".nii.gz")`.
pub fn split_filename<P: AsRef<Path>>(filepath: P) -> (PathBuf, String, String) {
    let p = filepath.as_ref();
    let dir = p.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = p
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (base, ext) = splitext(&name);
    if ext == ".gz" {
        let (base, inner) = splitext(base);
        return (dir, base.to_string(), format!("{inner}{ext}"));
    }
    (dir, base.to_string(), ext.to_string())
}

/// 列出目录 `path` 下匹配通配模式 `pattern` 的所有文件, 按字典序排序.
///
/// 1. 目录名中的通配元字符会被转义, 只有 `pattern` 参与匹配;
/// 2. 以 `.` 开头的隐藏文件 (例如 macOS 的 `._a.nii`) 不会被匹配;
/// 3. 子目录不会出现在结果中.
///
/// 目录名不是合法 UTF-8 时返回 [`DatasetError::Io`].
pub fn glob_imgs<P: AsRef<Path>>(path: P, pattern: &str) -> DatasetResult<Vec<PathBuf>> {
    let path = path.as_ref();
    let dir = path.to_str().ok_or_else(|| DatasetError::Io {
        path: path.to_owned(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "directory name is not valid UTF-8"),
    })?;
    let full = format!("{}{}{pattern}", glob::Pattern::escape(dir), MAIN_SEPARATOR);
    let opts = MatchOptions {
        require_literal_leading_dot: true,
        ..Default::default()
    };

    let mut fns = Vec::new();
    for entry in glob::glob_with(&full, opts)? {
        let p = entry?;
        if p.is_file() {
            fns.push(p);
        }
    }
    fns.sort();
    debug!("`{full}` matched {} file(s)", fns.len());
    Ok(fns)
}

/// 列出目录 `path` 下所有 nii 文件 (`.nii` 与 `.nii.gz`), 按字典序排序.
#[inline]
pub fn glob_nii<P: AsRef<Path>>(path: P) -> DatasetResult<Vec<PathBuf>> {
    glob_imgs(path, DEFAULT_NII_PATTERN)
}
