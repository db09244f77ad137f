use std::fmt;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::DavError;

/// A remote collection rooted below a fixed mount prefix.
///
/// `mount` is `scheme://host[/host-path]/<mount prefix>`; nothing at or above it is
/// ever created. `segments` are the decoded path components below the mount, in
/// order. They are percent-encoded only when a URL is built from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDir {
    mount: Url,
    segments: Vec<String>,
}

impl RemoteDir {
    /// Fails with [`DavError::InvalidTarget`] when the host is not a base URL or
    /// when the mount prefix or sub-path contains a `..` segment.
    pub fn new(
        host: &str,
        system_path: &str,
        remote_sub_path: Option<&str>,
    ) -> Result<Self, DavError> {
        let host = normalize_separators(host);
        let mut mount = Url::parse(host.trim_end_matches('/'))?;
        if mount.cannot_be_a_base() {
            return Err(DavError::InvalidTarget(host));
        }
        mount.set_query(None);
        mount.set_fragment(None);

        let prefix = split_segments(system_path)?;
        push_segments(&mut mount, &prefix, None);
        let segments = match remote_sub_path {
            Some(sub_path) => split_segments(sub_path)?,
            None => Vec::new(),
        };

        Ok(Self { mount, segments })
    }

    /// Splits an already assembled directory URL at `mount_prefix`.
    pub fn from_url(url: &str, mount_prefix: &str) -> Result<Self, DavError> {
        let url = normalize_separators(url);
        let parsed = Url::parse(&url)?;
        let path = parsed
            .path_segments()
            .ok_or_else(|| DavError::InvalidTarget(url.clone()))?
            .filter(|segment| !segment.is_empty())
            .map(|segment| decode_segment(segment, &url))
            .collect::<Result<Vec<_>, _>>()?;
        let prefix = split_segments(mount_prefix)?;
        if !path.starts_with(&prefix) {
            return Err(DavError::InvalidTarget(format!(
                "{url} is not below mount prefix {mount_prefix}"
            )));
        }

        let mut mount = parsed;
        mount.set_query(None);
        mount.set_fragment(None);
        mount.set_path("/");
        push_segments(&mut mount, &prefix, None);

        Ok(Self {
            mount,
            segments: path[prefix.len()..].to_vec(),
        })
    }

    pub fn mount_url(&self) -> &Url {
        &self.mount
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn url(&self) -> Url {
        self.join(&self.segments, None)
    }

    /// One URL per segment below the mount, shortest first.
    pub fn ancestor_urls(&self) -> Vec<Url> {
        (1..=self.segments.len())
            .map(|depth| self.join(&self.segments[..depth], None))
            .collect()
    }

    /// URL of `file_name` inside this directory; the name is escaped as a single
    /// path segment, so `%`, `/` and `?` never change the target.
    pub fn file_url(&self, file_name: &str) -> Url {
        self.join(&self.segments, Some(file_name))
    }

    fn join(&self, segments: &[String], leaf: Option<&str>) -> Url {
        let mut url = self.mount.clone();
        push_segments(&mut url, segments, leaf);
        url
    }
}

impl fmt::Display for RemoteDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url().as_str())
    }
}

fn normalize_separators(value: &str) -> String {
    value.replace('\\', "/")
}

fn split_segments(path: &str) -> Result<Vec<String>, DavError> {
    let path = normalize_separators(path);
    let mut segments = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if segment == ".." {
            return Err(DavError::InvalidTarget(format!(
                "{path} climbs out of the mount with '..'"
            )));
        }
        segments.push(segment.to_string());
    }
    Ok(segments)
}

fn decode_segment(segment: &str, url: &str) -> Result<String, DavError> {
    let decoded = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|_| DavError::InvalidTarget(format!("{url} has a non UTF-8 path")))?;
    if decoded == ".." {
        return Err(DavError::InvalidTarget(format!(
            "{url} climbs out of the mount with '..'"
        )));
    }
    Ok(decoded.into_owned())
}

// `url` is always a base URL here; both constructors reject the others.
fn push_segments(url: &mut Url, segments: &[String], leaf: Option<&str>) {
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty()
            .extend(segments.iter().map(String::as_str).chain(leaf));
    }
}
