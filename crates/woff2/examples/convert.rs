//! Converts the fonts given on the command line into `./dist`.
//!
//! ```text
//! cargo run --example convert -- fonts/a.ttf fonts/b.ttf
//! ```
//!
//! Set `STREAM=1` to read the fonts in stream mode and `CLONE=1` to copy the originals too.

use std::path::Path;

use futures::StreamExt;
use micro_vinyl::{StageExt, fs};
use micro_woff2::{ConversionOptions, ttf2woff2};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let stream_mode = std::env::var_os("STREAM").is_some();
    let options = ConversionOptions::new().with_clone(std::env::var_os("CLONE").is_some());

    let mut inputs = Vec::new();
    for path in std::env::args().skip(1) {
        let file = if stream_mode { fs::open_streaming(&path, None).await } else { fs::read_buffered(&path, None).await };
        match file {
            Ok(file) => inputs.push(file),
            Err(e) => warn!(path = %path, cause = %e, "skip unreadable file"),
        }
    }

    let (mut files, mut errors) = futures::stream::iter(inputs).through(ttf2woff2(options));

    let dist = Path::new("dist");
    while let Some(file) = files.next().await {
        match fs::write_to(file, dist).await {
            Ok(Some(path)) => info!(path = %path.display(), "written"),
            Ok(None) => {}
            Err(e) => error!(cause = %e, "failed to write file"),
        }

        for e in errors.drain() {
            error!(file = ?e.file_name(), cause = %e, "conversion failed");
        }
    }
}
