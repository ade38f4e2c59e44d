pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Current,
    Parent,
    Name(&'a str),
}

impl<'a> From<&'a str> for Segment<'a> {
    fn from(part: &'a str) -> Self {
        match part {
            "." => Segment::Current,
            ".." => Segment::Parent,
            name => Segment::Name(name),
        }
    }
}

pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// Splits a path into segments, dropping empty parts so that repeated and
/// trailing separators are ignored.
pub fn segments(path: &str) -> impl Iterator<Item = Segment<'_>> {
    path.split(SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(Segment::from)
}
