use camino::Utf8Path;
use md5::Context;
use std::fs::File;
use std::io::{BufReader, Read};

const CHUNK_SIZE: usize = 1 << 20;

/// Lowercase hex MD5 of a file, the digest S3 reports as etag for single-part uploads.
///
/// Blocking; call from `spawn_blocking` in async code.
pub fn compute_file_md5(path: &Utf8Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut ctx = Context::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(format!("{:x}", ctx.finalize()))
}
