use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use micro_vinyl::{ContentError, Contents, Emitter, FileObject, PluginError, Transform};
use tracing::{debug, error, trace};

use crate::codec::{FontCodec, Woff2Codec};
use crate::options::ConversionOptions;

/// The name this stage reports in its errors.
pub const PLUGIN_NAME: &str = "micro-woff2";

const SOURCE_EXT: &str = ".ttf";
const TARGET_EXT: &str = ".woff2";

/// Creates the per-buffer conversion callback used for streamed payloads.
///
/// The callback receives the collected payload (or the error that interrupted reading it),
/// runs `codec` on it and returns the converted buffer or a [`PluginError`] asking for a full
/// stack trace. It plugs straight into [`ContentStream::buffered`](micro_vinyl::ContentStream::buffered),
/// so other stages can reuse it without going through [`Ttf2Woff2`].
pub fn file_transform<C>(codec: Arc<C>) -> impl FnOnce(Result<Bytes, ContentError>) -> Result<Bytes, PluginError> + Send + 'static
where
    C: FontCodec + ?Sized + 'static,
{
    move |payload| {
        let ttf = payload.map_err(|e| PluginError::upstream(PLUGIN_NAME, e).with_show_stack(true))?;
        codec.encode(&ttf).map_err(|e| PluginError::codec(PLUGIN_NAME, e).with_show_stack(true))
    }
}

/// Creates a stage converting `.ttf` files to `.woff2` with the default codec.
pub fn ttf2woff2(options: ConversionOptions) -> Ttf2Woff2 {
    Ttf2Woff2::new(options)
}

/// A stage converting TrueType files to WOFF2.
///
/// Files without contents, directories and (unless [`ConversionOptions::ignore_ext`] is set)
/// files not ending in `.ttf` pass through untouched. Every other file is renamed to `.woff2`
/// and its payload replaced by the codec's output:
///
/// - a buffer is converted right away; when the codec fails the error goes to the stage's
///   error channel and the file is still emitted, renamed but with its original payload
/// - a stream is wrapped lazily, conversion happens when the payload is read and a failure is
///   yielded by that payload's stream only
///
/// With [`ConversionOptions::clone`] the untouched original is emitted right before the
/// converted file.
pub struct Ttf2Woff2<C: ?Sized = Woff2Codec> {
    options: ConversionOptions,
    codec: Arc<C>,
}

impl Ttf2Woff2 {
    pub fn new(options: ConversionOptions) -> Self {
        Self::with_codec(Arc::new(Woff2Codec), options)
    }
}

impl<C> Ttf2Woff2<C>
where
    C: FontCodec + ?Sized + 'static,
{
    pub fn with_codec(codec: Arc<C>, options: ConversionOptions) -> Self {
        Self { options, codec }
    }

    pub fn options(&self) -> ConversionOptions {
        self.options
    }

    fn accepts(&self, file: &FileObject) -> bool {
        self.options.ignore_ext || file.extname() == SOURCE_EXT
    }
}

impl<C> Transform for Ttf2Woff2<C>
where
    C: FontCodec + ?Sized + 'static,
{
    fn transform(&mut self, mut file: FileObject, emitter: &mut Emitter) {
        if file.is_null() || file.is_directory() {
            trace!(path = %file.path().display(), "no contents, pass through");
            emitter.push(file);
            return;
        }

        if !self.accepts(&file) {
            trace!(path = %file.path().display(), "not a ttf file, pass through");
            emitter.push(file);
            return;
        }

        if self.options.clone {
            emitter.push(file.fork());
        }

        let source = file.path().to_path_buf();
        file.replace_extension(TARGET_EXT);

        match file.take_contents() {
            Contents::Buffer(ttf) => match self.codec.encode(&ttf) {
                Ok(woff2) => {
                    debug!(path = %source.display(), input = ttf.len(), output = woff2.len(), "converted font");
                    file.set_contents(woff2);
                }
                Err(e) => {
                    error!(path = %source.display(), cause = %e, "failed to convert font");
                    // the file keeps its new name but not a converted payload
                    file.set_contents(ttf);
                    emitter.emit_error(PluginError::codec(PLUGIN_NAME, e).with_show_stack(true).with_file_name(source));
                }
            },
            Contents::Stream(stream) => {
                debug!(path = %source.display(), "converting font stream");
                let convert = file_transform(Arc::clone(&self.codec));
                file.set_contents(stream.buffered(move |payload| convert(payload).map_err(|e| e.with_file_name(source))));
            }
            Contents::Null => {}
        }

        emitter.push(file);
    }
}

impl<C: ?Sized> fmt::Debug for Ttf2Woff2<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ttf2Woff2").field("options", &self.options).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use futures::{Stream, StreamExt, stream};
    use micro_vinyl::{ContentStream, ErrorKind, StageErrors, StageExt, fs};
    use mockall::mock;
    use std::path::Path;

    const TTF: &[u8] = b"\x00\x01\x00\x00 pretend glyph tables";

    mock! {
        Codec {}

        impl FontCodec for Codec {
            fn encode(&self, ttf: &[u8]) -> Result<Bytes, CodecError>;
        }
    }

    /// Prefixes the payload, or fails on payloads starting with `bad`.
    fn fake_encode(ttf: &[u8]) -> Result<Bytes, CodecError> {
        if ttf.starts_with(b"bad") {
            return Err(CodecError::encode("unsupported font format"));
        }
        let mut woff2 = b"wOF2".to_vec();
        woff2.extend_from_slice(ttf);
        Ok(Bytes::from(woff2))
    }

    type FakeCodec = fn(&[u8]) -> Result<Bytes, CodecError>;

    fn stage(options: ConversionOptions) -> Ttf2Woff2<FakeCodec> {
        Ttf2Woff2::with_codec(Arc::new(fake_encode as FakeCodec), options)
    }

    fn run<T: Transform>(files: Vec<FileObject>, stage: T) -> (impl Stream<Item = FileObject>, StageErrors) {
        stream::iter(files).through(stage)
    }

    async fn read(file: FileObject) -> Result<Option<Bytes>, ContentError> {
        file.into_contents().into_bytes().await
    }

    #[tokio::test]
    async fn null_files_pass_through() {
        let files = vec![FileObject::new("bibabelula.foo", Contents::Null), FileObject::new("font.ttf", Contents::Null)];
        let (output, mut errors) = run(files, stage(ConversionOptions::new()));

        let output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].path(), Path::new("bibabelula.foo"));
        assert_eq!(output[1].path(), Path::new("font.ttf"));
        assert!(output.iter().all(FileObject::is_null));
        assert!(errors.drain().is_empty());
    }

    #[tokio::test]
    async fn directories_pass_through_even_without_ext_check() {
        let (output, _errors) = run(vec![FileObject::directory("fonts.ttf")], stage(ConversionOptions::new().with_ignore_ext(true)));

        let output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 1);
        assert!(output[0].is_directory());
        assert_eq!(output[0].path(), Path::new("fonts.ttf"));
    }

    #[tokio::test]
    async fn non_ttf_buffer_passes_through() {
        let (output, _errors) = run(vec![FileObject::new("notes.txt", "ohyeah")], stage(ConversionOptions::new()));

        let mut output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 1);
        let file = output.remove(0);
        assert_eq!(file.path(), Path::new("notes.txt"));
        assert_eq!(file.history().len(), 1);
        assert_eq!(read(file).await.unwrap(), Some(Bytes::from_static(b"ohyeah")));
    }

    #[tokio::test]
    async fn non_ttf_stream_passes_through() {
        let (output, _errors) = run(vec![FileObject::new("bibabelula.foo", ContentStream::empty())], stage(ConversionOptions::new()));

        let output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].path(), Path::new("bibabelula.foo"));
        assert!(output[0].is_stream());
    }

    #[tokio::test]
    async fn extension_check_is_case_sensitive() {
        let (output, _errors) = run(vec![FileObject::new("FONT.TTF", TTF)], stage(ConversionOptions::new()));

        let mut output: Vec<FileObject> = output.collect().await;
        let file = output.remove(0);
        assert_eq!(file.path(), Path::new("FONT.TTF"));
        assert_eq!(read(file).await.unwrap(), Some(Bytes::from_static(TTF)));
    }

    #[tokio::test]
    async fn pass_through_is_idempotent() {
        let (once, _) = run(vec![FileObject::new("notes.txt", "ohyeah")], stage(ConversionOptions::new()));
        let (twice, _) = once.through(stage(ConversionOptions::new()));

        let mut output: Vec<FileObject> = twice.collect().await;
        assert_eq!(output.len(), 1);
        let file = output.remove(0);
        assert_eq!(file.path(), Path::new("notes.txt"));
        assert_eq!(read(file).await.unwrap(), Some(Bytes::from_static(b"ohyeah")));
    }

    #[tokio::test]
    async fn converts_buffer() {
        let (output, mut errors) = run(vec![FileObject::new("fonts/font.ttf", TTF)], stage(ConversionOptions::new()));

        let mut output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 1);
        let file = output.remove(0);
        assert_eq!(file.path(), Path::new("fonts/font.woff2"));
        assert!(file.is_buffer());
        assert_eq!(read(file).await.unwrap(), Some(fake_encode(TTF).unwrap()));
        assert!(errors.drain().is_empty());
    }

    #[tokio::test]
    async fn converts_any_extension_when_ignoring_ext() {
        let (output, _errors) = run(vec![FileObject::new("font.otf", TTF)], stage(ConversionOptions::new().with_ignore_ext(true)));

        let mut output: Vec<FileObject> = output.collect().await;
        let file = output.remove(0);
        assert_eq!(file.path(), Path::new("font.woff2"));
        assert_eq!(read(file).await.unwrap(), Some(fake_encode(TTF).unwrap()));
    }

    #[tokio::test]
    async fn clone_emits_original_first_for_buffers() {
        let (output, _errors) = run(vec![FileObject::new("font.ttf", TTF)], stage(ConversionOptions::new().with_clone(true)));

        let mut output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 2);
        let converted = output.pop().unwrap();
        let original = output.pop().unwrap();

        assert_eq!(original.path(), Path::new("font.ttf"));
        assert_eq!(converted.path(), Path::new("font.woff2"));
        assert_eq!(read(original).await.unwrap(), Some(Bytes::from_static(TTF)));
        assert_eq!(read(converted).await.unwrap(), Some(fake_encode(TTF).unwrap()));
    }

    #[tokio::test]
    async fn clone_keeps_input_order() {
        let files = vec![FileObject::new("a.ttf", TTF), FileObject::new("b.txt", "ohyeah"), FileObject::new("c.ttf", TTF)];
        let (output, _errors) = run(files, stage(ConversionOptions::new().with_clone(true)));

        let output: Vec<FileObject> = output.collect().await;
        let paths: Vec<&Path> = output.iter().map(FileObject::path).collect();
        assert_eq!(paths, vec![Path::new("a.ttf"), Path::new("a.woff2"), Path::new("b.txt"), Path::new("c.ttf"), Path::new("c.woff2")]);
    }

    #[tokio::test]
    async fn converts_stream_lazily() {
        let chunks = vec![Bytes::from_static(&TTF[..4]), Bytes::from_static(&TTF[4..])];
        let (output, mut errors) = run(vec![FileObject::new("font.ttf", ContentStream::from_chunks(chunks))], stage(ConversionOptions::new()));

        let mut output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 1);
        let file = output.remove(0);
        assert_eq!(file.path(), Path::new("font.woff2"));
        assert!(file.is_stream());
        assert_eq!(read(file).await.unwrap(), Some(fake_encode(TTF).unwrap()));
        assert!(errors.drain().is_empty());
    }

    #[tokio::test]
    async fn clone_forks_streams() {
        let (output, _errors) = run(vec![FileObject::new("font.ttf", ContentStream::once(Bytes::from_static(TTF)))], stage(ConversionOptions::new().with_clone(true)));

        let mut output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 2);
        let converted = output.pop().unwrap();
        let original = output.pop().unwrap();
        assert_eq!(original.path(), Path::new("font.ttf"));
        assert_eq!(converted.path(), Path::new("font.woff2"));

        // read the converted one first, the original must still see every byte
        assert_eq!(read(converted).await.unwrap(), Some(fake_encode(TTF).unwrap()));
        assert_eq!(read(original).await.unwrap(), Some(Bytes::from_static(TTF)));
    }

    #[tokio::test]
    async fn buffer_and_stream_conversions_agree() {
        let files = vec![FileObject::new("a.ttf", TTF), FileObject::new("b.ttf", ContentStream::from_reader(TTF))];
        let (output, _errors) = run(files, stage(ConversionOptions::new()));

        let mut output: Vec<FileObject> = output.collect().await;
        let streamed = read(output.pop().unwrap()).await.unwrap();
        let buffered = read(output.pop().unwrap()).await.unwrap();
        assert_eq!(buffered, streamed);
    }

    #[tokio::test]
    async fn buffer_failure_is_reported_on_the_stage() {
        let files = vec![FileObject::new("fonts/broken.ttf", "bad font"), FileObject::new("font.ttf", TTF)];
        let (output, errors) = run(files, stage(ConversionOptions::new()));

        let mut output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 2);

        let converted = output.pop().unwrap();
        assert_eq!(read(converted).await.unwrap(), Some(fake_encode(TTF).unwrap()));

        // renamed, but the payload is left as it was
        let broken = output.pop().unwrap();
        assert_eq!(broken.path(), Path::new("fonts/broken.woff2"));
        assert_eq!(read(broken).await.unwrap(), Some(Bytes::from_static(b"bad font")));

        let errors: Vec<PluginError> = errors.collect().await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].plugin(), PLUGIN_NAME);
        assert_eq!(errors[0].kind(), ErrorKind::Codec);
        assert_eq!(errors[0].message(), "unsupported font format");
        assert!(errors[0].show_stack());
        assert_eq!(errors[0].file_name(), Some(Path::new("fonts/broken.ttf")));
    }

    #[tokio::test]
    async fn stream_failure_is_reported_on_the_payload() {
        let (output, errors) = run(vec![FileObject::new("broken.ttf", ContentStream::once(Bytes::from_static(b"bad font")))], stage(ConversionOptions::new()));

        let mut output: Vec<FileObject> = output.collect().await;
        let file = output.remove(0);
        assert_eq!(file.path(), Path::new("broken.woff2"));

        let error = read(file).await.unwrap_err();
        let plugin_error = error.as_plugin_error().expect("should be a plugin error");
        assert_eq!(plugin_error.kind(), ErrorKind::Codec);
        assert_eq!(plugin_error.message(), "unsupported font format");
        assert_eq!(plugin_error.file_name(), Some(Path::new("broken.ttf")));

        let errors: Vec<PluginError> = errors.collect().await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_is_wrapped() {
        let source = ContentStream::new(stream::iter(vec![Ok(Bytes::from_static(TTF)), Err(ContentError::io(std::io::Error::other("disk unplugged")))]));
        let (output, _errors) = run(vec![FileObject::new("font.ttf", source)], stage(ConversionOptions::new()));

        let mut output: Vec<FileObject> = output.collect().await;
        let error = read(output.remove(0)).await.unwrap_err();
        let plugin_error = error.as_plugin_error().expect("should be a plugin error");
        assert_eq!(plugin_error.kind(), ErrorKind::Upstream);
        assert_eq!(plugin_error.message(), "io error: disk unplugged");
        assert!(plugin_error.show_stack());
    }

    #[tokio::test]
    async fn codec_is_not_called_for_pass_through() {
        let mut codec = MockCodec::new();
        codec.expect_encode().never();

        let files = vec![FileObject::new("notes.txt", "ohyeah"), FileObject::new("font.ttf", Contents::Null)];
        let (output, _errors) = run(files, Ttf2Woff2::with_codec(Arc::new(codec), ConversionOptions::new()));
        assert_eq!(output.count().await, 2);
    }

    #[tokio::test]
    async fn codec_runs_once_per_stream_on_read() {
        let mut codec = MockCodec::new();
        codec.expect_encode().times(1).returning(|ttf| Ok(Bytes::copy_from_slice(ttf)));

        let chunks = vec![Bytes::from_static(b"gl"), Bytes::from_static(b"yphs")];
        let (output, _errors) = run(vec![FileObject::new("font.ttf", ContentStream::from_chunks(chunks))], Ttf2Woff2::with_codec(Arc::new(codec), ConversionOptions::new()));

        let mut output: Vec<FileObject> = output.collect().await;
        assert_eq!(read(output.remove(0)).await.unwrap(), Some(Bytes::from_static(b"glyphs")));
    }

    #[tokio::test]
    async fn default_codec_reports_invalid_fonts() {
        let (output, errors) = run(vec![FileObject::new("font.ttf", "ohyeah")], ttf2woff2(ConversionOptions::default()));

        let output: Vec<FileObject> = output.collect().await;
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].path(), Path::new("font.woff2"));

        let errors: Vec<PluginError> = errors.collect().await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::Codec);
    }

    #[tokio::test]
    async fn default_codec_converts_buffers_and_streams_alike() {
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/DejaVuSansMono-Oblique.ttf");
        let original = Bytes::from(tokio::fs::read(&fixture).await.unwrap());

        let files = vec![fs::read_buffered(&fixture, None).await.unwrap(), fs::open_streaming(&fixture, None).await.unwrap()];
        let (output, errors) = run(files, ttf2woff2(ConversionOptions::new().with_clone(true)));

        let output: Vec<FileObject> = output.collect().await;
        let names: Vec<_> = output.iter().map(|file| file.path().file_name().unwrap().to_owned()).collect();
        assert_eq!(names, vec!["DejaVuSansMono-Oblique.ttf", "DejaVuSansMono-Oblique.woff2", "DejaVuSansMono-Oblique.ttf", "DejaVuSansMono-Oblique.woff2"]);

        let mut payloads = Vec::new();
        for file in output {
            payloads.push(read(file).await.unwrap().unwrap());
        }
        assert_eq!(payloads[0], original);
        assert_eq!(payloads[2], original);
        assert!(payloads[1].starts_with(b"wOF2"));
        assert_eq!(payloads[1], Woff2Codec.encode(&original).unwrap());
        assert_eq!(payloads[1], payloads[3]);

        let errors: Vec<PluginError> = errors.collect().await;
        assert!(errors.is_empty());
    }

    #[test]
    fn file_transform_standalone() {
        let convert = file_transform(Arc::new(fake_encode));
        assert_eq!(convert(Ok(Bytes::from_static(TTF))).unwrap(), fake_encode(TTF).unwrap());

        let convert = file_transform(Arc::new(fake_encode));
        let error = convert(Ok(Bytes::from_static(b"bad"))).unwrap_err();
        assert_eq!(error.to_string(), "micro-woff2: unsupported font format");
    }
}
