// SPDX-License-Identifier: MIT OR Apache-2.0
//! File-path decoding into `path`, `drive_letter`, `folder`, `name` and
//! `extension`.
//!
//! The Windows form is triggered by a `<letter>:` + separator prefix and
//! uppercases the drive letter in the output. The `UNIX` argument forces
//! `/`-only separators, with `'\'` and `':'` treated as ordinary filename
//! bytes.

use super::{Decoded, DecodeFail, Emitted, scan_token};
use crate::value::Value;

pub(crate) fn decode(
    input: &str,
    cursor: usize,
    stop: Option<&str>,
    unix: bool,
) -> Result<Decoded, DecodeFail> {
    let (token, end) = scan_token(input, cursor, stop);
    if token.is_empty() {
        return Ok(Decoded::Silent { end });
    }

    let bytes = token.as_bytes();
    let drive = if !unix
        && bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
    {
        (bytes[0] as char).to_ascii_uppercase().to_string()
    } else {
        String::new()
    };

    let is_sep = |b: u8| b == b'/' || (!unix && b == b'\\');
    let last_sep = bytes.iter().rposition(|&b| is_sep(b));
    let (folder, name) = match last_sep {
        Some(idx) => (&token[..idx], &token[idx + 1..]),
        None => ("", token),
    };
    let extension = name.rfind('.').map_or("", |idx| &name[idx + 1..]);

    let fields: Vec<Emitted> = vec![
        (Some("path"), Value::from(token)),
        (Some("drive_letter"), Value::Str(drive)),
        (Some("folder"), Value::from(folder)),
        (Some("name"), Value::from(name)),
        (Some("extension"), Value::from(extension)),
    ];
    Ok(Decoded::Fields { fields, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn parts(token: &str, unix: bool) -> BTreeMap<&'static str, String> {
        match decode(token, 0, None, unix).unwrap() {
            Decoded::Fields { fields, .. } => fields
                .into_iter()
                .map(|(sub, v)| match v {
                    Value::Str(s) => (sub.unwrap(), s),
                    other => panic!("unexpected value {other:?}"),
                })
                .collect(),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn windows_absolute_path() {
        let p = parts(r"C:\Users\Name\Desktop\test.txt", false);
        assert_eq!(p["path"], r"C:\Users\Name\Desktop\test.txt");
        assert_eq!(p["drive_letter"], "C");
        assert_eq!(p["folder"], r"C:\Users\Name\Desktop");
        assert_eq!(p["name"], "test.txt");
        assert_eq!(p["extension"], "txt");
    }

    #[test]
    fn windows_relative_and_bare_names() {
        let p = parts(r"Desktop\test.txt", false);
        assert_eq!(p["drive_letter"], "");
        assert_eq!(p["folder"], "Desktop");
        assert_eq!(p["name"], "test.txt");

        let p = parts("test.txt", false);
        assert_eq!(p["folder"], "");
        assert_eq!(p["name"], "test.txt");
        assert_eq!(p["extension"], "txt");

        let p = parts(r"Desktop\test", false);
        assert_eq!(p["name"], "test");
        assert_eq!(p["extension"], "");
    }

    #[test]
    fn windows_folder_path_and_lowercase_drive() {
        let p = parts(r"D:\Users\Name\Desktop\", false);
        assert_eq!(p["drive_letter"], "D");
        assert_eq!(p["folder"], r"D:\Users\Name\Desktop");
        assert_eq!(p["name"], "");
        assert_eq!(p["extension"], "");

        let p = parts(r"c:\test.txt", false);
        assert_eq!(p["path"], r"c:\test.txt");
        assert_eq!(p["drive_letter"], "C");
        assert_eq!(p["folder"], "c:");
        assert_eq!(p["name"], "test.txt");
    }

    #[test]
    fn unix_paths() {
        let p = parts("/Desktop/test.txt", false);
        assert_eq!(p["drive_letter"], "");
        assert_eq!(p["folder"], "/Desktop");
        assert_eq!(p["name"], "test.txt");

        let p = parts("/Desktop/", false);
        assert_eq!(p["name"], "");
        assert_eq!(p["extension"], "");
    }

    #[test]
    fn forced_unix_treats_backslash_and_colon_as_plain_bytes() {
        let p = parts(r"C:\_test.txt", true);
        assert_eq!(p["drive_letter"], "");
        assert_eq!(p["folder"], "");
        assert_eq!(p["name"], r"C:\_test.txt");
        assert_eq!(p["extension"], "txt");

        let p = parts(r"/Desktop/test\1:2.txt", true);
        assert_eq!(p["folder"], "/Desktop");
        assert_eq!(p["name"], r"test\1:2.txt");
        assert_eq!(p["extension"], "txt");
    }
}
