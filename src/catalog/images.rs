use std::str::FromStr;

/// Size buckets the image CDN serves. Not every bucket exists for every image
/// kind; asking for an unsupported combination is the caller's problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    W45,
    W92,
    W154,
    W185,
    W300,
    W342,
    W500,
    W780,
    W1280,
    H632,
    Original,
}

pub const DEFAULT_POSTER_SIZE: ImageSize = ImageSize::W500;
pub const DEFAULT_BACKDROP_SIZE: ImageSize = ImageSize::Original;

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W45 => "w45",
            ImageSize::W92 => "w92",
            ImageSize::W154 => "w154",
            ImageSize::W185 => "w185",
            ImageSize::W300 => "w300",
            ImageSize::W342 => "w342",
            ImageSize::W500 => "w500",
            ImageSize::W780 => "w780",
            ImageSize::W1280 => "w1280",
            ImageSize::H632 => "h632",
            ImageSize::Original => "original",
        }
    }
}

impl FromStr for ImageSize {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let size = match s.trim() {
            "w45" => ImageSize::W45,
            "w92" => ImageSize::W92,
            "w154" => ImageSize::W154,
            "w185" => ImageSize::W185,
            "w300" => ImageSize::W300,
            "w342" => ImageSize::W342,
            "w500" => ImageSize::W500,
            "w780" => ImageSize::W780,
            "w1280" => ImageSize::W1280,
            "h632" => ImageSize::H632,
            "original" => ImageSize::Original,
            other => return Err(anyhow::anyhow!("unknown image size '{}'", other)),
        };
        Ok(size)
    }
}

/// Composes image URLs against the CDN base. Pure string work; nothing is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBase {
    base: String,
}

impl ImageBase {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn image_url(&self, path: Option<&str>, size: ImageSize) -> Option<String> {
        compose(&self.base, path, size)
    }

    pub fn backdrop_url(&self, path: Option<&str>, size: ImageSize) -> Option<String> {
        compose(&self.base, path, size)
    }
}

/// `{base}/{size}/{path}` with exactly one slash at each join, or `None`
/// when there is no path to point at.
fn compose(base: &str, path: Option<&str>, size: ImageSize) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    let base = base.trim_end_matches('/');
    Some(format!("{base}/{}/{path}", size.as_str()))
}
