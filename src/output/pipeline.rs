//! # Streaming Pipeline
//!
//! Drives a datastore entity stream through an encoder into a byte
//! sink, optionally gzip-compressed. Compression is decided before the
//! first byte is written; once output starts, a mid-stream failure
//! leaves a truncated document, which is the only honest signal left.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;

use crate::datastore::EntityStream;
use crate::output::errors::{OutputError, OutputResult};
use crate::output::formats::FormatRegistry;
use crate::query::OutputFormat;

/// Transfer compression applied to the rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

impl Compression {
    /// Picks a compression from an `Accept-Encoding` header value.
    pub fn negotiate(accept_encoding: Option<&str>) -> Self {
        match accept_encoding {
            Some(value)
                if value
                    .split(',')
                    .any(|token| token.trim().split(';').next() == Some("gzip")) =>
            {
                Self::Gzip
            }
            _ => Self::None,
        }
    }

    /// The `Content-Encoding` value to advertise, if any.
    pub fn content_encoding(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Gzip => Some("gzip"),
        }
    }
}

/// Streams every entity through an encoder for `format` into
/// `raw_sink`, returning the number of entities written.
///
/// The stream is released on every exit path. The gzip trailer is
/// written explicitly on the success path; a failure writing it is a
/// failure of the whole transfer, not something `Drop` may swallow.
pub fn stream_entities<W: Write>(
    mut entities: Box<dyn EntityStream + Send + '_>,
    format: OutputFormat,
    registry: &dyn FormatRegistry,
    raw_sink: W,
    compression: Compression,
) -> OutputResult<u64> {
    let result = match compression {
        Compression::None => drive(entities.as_mut(), format, registry, Box::new(raw_sink)),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(raw_sink, GzLevel::default());
            match drive(entities.as_mut(), format, registry, Box::new(&mut encoder)) {
                Ok(count) => encoder
                    .try_finish()
                    .map(|()| count)
                    .map_err(OutputError::from),
                Err(err) => Err(err),
            }
        }
    };
    entities.release();
    result
}

fn drive(
    entities: &mut (dyn EntityStream + Send),
    format: OutputFormat,
    registry: &dyn FormatRegistry,
    sink: Box<dyn Write + '_>,
) -> OutputResult<u64> {
    let mut encoder = registry.encoder_for(format, sink)?;
    let mut count = 0u64;
    while let Some(entity) = entities.next_entity()? {
        encoder.process(&entity)?;
        count += 1;
    }
    encoder.complete()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::datastore::{DatastoreResult, Entity, EntityInfo, Node};
    use crate::output::formats::DefaultFormatRegistry;

    struct VecStream {
        items: std::vec::IntoIter<Entity>,
    }

    impl EntityStream for VecStream {
        fn next_entity(&mut self) -> DatastoreResult<Option<Entity>> {
            Ok(self.items.next())
        }

        fn release(&mut self) {}
    }

    /// Accepts writes until the first flush, then rejects everything.
    /// The gzip body is flushed when the encoder sink completes, so
    /// the only writes after the flush are the 8 trailer bytes.
    struct TrailerFailSink {
        flushed: bool,
    }

    impl Write for TrailerFailSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.flushed {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            } else {
                Ok(buf.len())
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushed = true;
            Ok(())
        }
    }

    #[test]
    fn test_gzip_trailer_write_failure_is_reported() {
        let node = Entity::Node(Node {
            id: 1,
            lat: 0.0,
            lon: 0.0,
            tags: Default::default(),
            info: EntityInfo::default(),
        });
        let stream = Box::new(VecStream {
            items: vec![node].into_iter(),
        });
        let result = stream_entities(
            stream,
            OutputFormat::Xml,
            &DefaultFormatRegistry,
            TrailerFailSink { flushed: false },
            Compression::Gzip,
        );
        assert!(matches!(result, Err(OutputError::Io(_))));
    }

    #[test]
    fn test_negotiate_gzip() {
        assert_eq!(Compression::negotiate(Some("gzip")), Compression::Gzip);
        assert_eq!(
            Compression::negotiate(Some("deflate, gzip;q=0.8")),
            Compression::Gzip
        );
        assert_eq!(Compression::negotiate(Some("br")), Compression::None);
        assert_eq!(Compression::negotiate(None), Compression::None);
    }

    #[test]
    fn test_content_encoding_header() {
        assert_eq!(Compression::Gzip.content_encoding(), Some("gzip"));
        assert_eq!(Compression::None.content_encoding(), None);
    }
}
