//! MD5 helpers: every hash in this provider's wire contract is lowercase hex MD5.

/// MD5 of an in-memory buffer, lowercase hex.
pub fn md5_hex(data: impl AsRef<[u8]>) -> String {
    format!("{:x}", md5::compute(data.as_ref()))
}

/// Streaming MD5 accumulator, used by the materializer (spec §4.J) to
/// compute a digest online while writing the source to a sparse temp file.
#[derive(Default)]
pub struct StreamingMd5 {
    ctx: md5::Context,
}

impl StreamingMd5 {
    pub fn new() -> Self {
        Self {
            ctx: md5::Context::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.ctx.consume(chunk);
    }

    pub fn finalize_hex(self) -> String {
        format!("{:x}", self.ctx.compute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_hex_matches_known_digest() {
        assert_eq!(md5_hex(b"hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut streaming = StreamingMd5::new();
        streaming.update(b"hello ");
        streaming.update(b"world");
        assert_eq!(streaming.finalize_hex(), md5_hex(b"hello world"));
    }
}
