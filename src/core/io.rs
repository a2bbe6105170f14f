//! Line sources for the table engine
//!
//! Opens plain, gzip and bzip2 text files (buffered or memory-mapped) and
//! streams the output of `samtools view` / `bcftools view` for binary
//! inputs. Every source is an iterator of `io::Result<String>` lines that
//! [`RecordTable::load`] can consume. [`BamWriter`] goes the other way and
//! pipes SAM text into `samtools view -bS`.

use crate::core::error::{BioTableError, TableResult};
use crate::core::schema::FormatDescriptor;
use crate::core::table::RecordTable;
use crate::core::writer::WriteOptions;
use crate::formats::{sam, Format};
use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;
use log::{debug, error, info};
use memmap2::Mmap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

/// Default buffer size for BufReader (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Buffer size for files above 10MB (1MB)
pub const LARGE_BUFFER_SIZE: usize = 1024 * 1024;

/// Plain files at least this large are memory-mapped (100MB)
pub const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// How plain text files are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoStrategy {
    Buffered(usize),
    MemoryMapped,
    /// Pick by file size
    #[default]
    Auto,
}

/// Compression of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
    Bzip2,
}

impl Compression {
    /// Recognise gzip (`1f 8b`) and bzip2 (`BZh`) magic bytes
    pub fn from_magic(magic: &[u8]) -> Self {
        match magic {
            [0x1f, 0x8b, ..] => Compression::Gzip,
            [b'B', b'Z', b'h', ..] => Compression::Bzip2,
            _ => Compression::Plain,
        }
    }

    /// File suffix of the compression, if any
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Compression::Plain => None,
            Compression::Gzip => Some(".gz"),
            Compression::Bzip2 => Some(".bz2"),
        }
    }
}

/// Detect compression from the extension, then from the magic bytes
///
/// Extensions match case-insensitively (`.gz`, `.GZ`, `.bz2`, `.BZ2`).
pub fn detect_compression(path: &Path) -> io::Result<Compression> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if ext.eq_ignore_ascii_case("gz") {
            return Ok(Compression::Gzip);
        }
        if ext.eq_ignore_ascii_case("bz2") {
            return Ok(Compression::Bzip2);
        }
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(Compression::from_magic(&magic[..filled]))
}

/// Read-only view of a memory-mapped file
pub struct MappedReader {
    mmap: Mmap,
    position: usize,
}

impl MappedReader {
    pub fn new(file: &File) -> io::Result<Self> {
        // SAFETY: the input file is not modified while the table loads
        let mmap = unsafe { Mmap::map(file)? };
        Ok(Self { mmap, position: 0 })
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

impl Read for MappedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.fill_buf()?.read(buf)?;
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for MappedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(&self.mmap[self.position..])
    }

    fn consume(&mut self, amt: usize) {
        self.position = (self.position + amt).min(self.mmap.len());
    }
}

/// Plain-file reader using either a buffer or a memory map
pub enum SmartReader {
    Buffered(BufReader<File>),
    Mapped(MappedReader),
}

impl SmartReader {
    pub fn open<P: AsRef<Path>>(path: P, strategy: IoStrategy) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();

        let reader = match strategy {
            IoStrategy::Buffered(capacity) => SmartReader::Buffered(BufReader::with_capacity(capacity, file)),
            IoStrategy::MemoryMapped => SmartReader::Mapped(MappedReader::new(&file)?),
            IoStrategy::Auto if size >= MMAP_THRESHOLD => SmartReader::Mapped(MappedReader::new(&file)?),
            IoStrategy::Auto => {
                let capacity = if size > 10 * 1024 * 1024 { LARGE_BUFFER_SIZE } else { DEFAULT_BUFFER_SIZE };
                SmartReader::Buffered(BufReader::with_capacity(capacity, file))
            }
        };
        Ok(reader)
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, SmartReader::Mapped(_))
    }
}

impl Read for SmartReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SmartReader::Buffered(r) => r.read(buf),
            SmartReader::Mapped(r) => r.read(buf),
        }
    }
}

impl BufRead for SmartReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            SmartReader::Buffered(r) => r.fill_buf(),
            SmartReader::Mapped(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            SmartReader::Buffered(r) => r.consume(amt),
            SmartReader::Mapped(r) => r.consume(amt),
        }
    }
}

/// Open a text file, transparently decompressing gzip and bzip2
pub fn open_text(path: &Path, strategy: IoStrategy) -> io::Result<Box<dyn BufRead>> {
    let compression = detect_compression(path)?;
    debug!("Opening {} ({:?})", path.display(), compression);

    Ok(match compression {
        Compression::Gzip => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            MultiGzDecoder::new(File::open(path)?),
        )),
        Compression::Bzip2 => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            BzDecoder::new(File::open(path)?),
        )),
        Compression::Plain => Box::new(SmartReader::open(path, strategy)?),
    })
}

/// Lines of any reader without their `\n` / `\r\n` terminators
pub struct LineSource<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Collect a child's stderr on a helper thread
fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut text = String::new();
            let _ = pipe.read_to_string(&mut text);
            text
        })
    })
}

fn join_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Stdout of an external converter, line by line
///
/// Stderr is drained on a helper thread so a chatty tool cannot block.
/// Call [`ToolSource::finish`] after the lines are consumed to check the
/// exit status.
pub struct ToolSource {
    program: String,
    child: Child,
    lines: LineSource<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
}

impl ToolSource {
    pub fn spawn<S: AsRef<str>>(program: &Path, args: &[S]) -> TableResult<Self> {
        let program_name = program.display().to_string();
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        debug!("Running: {} {}", program_name, args.join(" "));

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdout not captured"))?;
        let stderr = drain_stderr(&mut child);

        Ok(Self {
            program: program_name,
            child,
            lines: LineSource::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stdout)),
            stderr,
        })
    }

    /// Wait for the tool and turn a non-zero exit into an error
    pub fn finish(mut self) -> TableResult<()> {
        let status = self.child.wait()?;
        let stderr = join_stderr(self.stderr.take());
        if status.success() {
            Ok(())
        } else {
            Err(BioTableError::ToolFailed {
                program: self.program.clone(),
                status: status.to_string(),
                stderr,
            })
        }
    }

    /// Stop the tool early, discarding its output
    pub fn abort(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Iterator for ToolSource {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

/// How an input path is turned into lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Text file, possibly compressed
    Text,
    /// BAM or CRAM, read through `samtools view -h`
    Alignment,
    /// BCF, read through `bcftools view`
    Bcf,
}

impl InputKind {
    /// Classify a path, rejecting extensions the format does not accept
    ///
    /// # Examples
    /// ```
    /// use biotable::core::io::InputKind;
    /// use biotable::formats::Format;
    /// use std::path::Path;
    ///
    /// assert_eq!(InputKind::detect(Format::Vcf, Path::new("calls.vcf.gz")).unwrap(), InputKind::Text);
    /// assert_eq!(InputKind::detect(Format::Sam, Path::new("reads.cram")).unwrap(), InputKind::Alignment);
    /// assert!(InputKind::detect(Format::Bed, Path::new("peaks.csv")).is_err());
    /// ```
    pub fn detect(format: Format, path: &Path) -> TableResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if format.binary_extensions().iter().any(|ext| name.ends_with(ext)) {
            return Ok(match format {
                Format::Vcf => InputKind::Bcf,
                _ => InputKind::Alignment,
            });
        }

        let stem = [Compression::Gzip, Compression::Bzip2]
            .iter()
            .filter_map(Compression::suffix)
            .find_map(|suffix| name.strip_suffix(suffix))
            .unwrap_or(name.as_str());
        if format.text_extensions().iter().any(|ext| stem.ends_with(ext)) {
            Ok(InputKind::Text)
        } else {
            Err(BioTableError::InvalidExtension {
                format: format.descriptor().name,
                path: path.display().to_string(),
            })
        }
    }
}

/// Settings for loading files and driving external tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// samtools executable; `samtools` on PATH when unset
    pub samtools: Option<PathBuf>,
    /// bcftools executable; `bcftools` on PATH when unset
    pub bcftools: Option<PathBuf>,
    /// Threads handed to the external tool
    pub threads: usize,
    /// samtools regions (`rname[:start[-end]]`); forces samtools for SAM input
    pub regions: Vec<String>,
    pub io_strategy: IoStrategy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            samtools: None,
            bcftools: None,
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            regions: Vec::new(),
            io_strategy: IoStrategy::Auto,
        }
    }
}

impl LoadOptions {
    fn samtools(&self) -> PathBuf {
        self.samtools.clone().unwrap_or_else(|| PathBuf::from("samtools"))
    }

    fn bcftools(&self) -> PathBuf {
        self.bcftools.clone().unwrap_or_else(|| PathBuf::from("bcftools"))
    }
}

/// `samtools view` arguments for a path
pub fn samtools_view_args(path: &Path, options: &LoadOptions) -> Vec<String> {
    let mut args = vec![
        "view".to_string(),
        "-@".to_string(),
        options.threads.to_string(),
        "-h".to_string(),
        path.display().to_string(),
    ];
    args.extend(options.regions.iter().cloned());
    args
}

/// `bcftools view` arguments for a path
pub fn bcftools_view_args(path: &Path, options: &LoadOptions) -> Vec<String> {
    vec![
        "view".to_string(),
        "--threads".to_string(),
        options.threads.to_string(),
        path.display().to_string(),
    ]
}

fn format_of(descriptor: &FormatDescriptor) -> Option<Format> {
    match descriptor.name {
        "VCF" => Some(Format::Vcf),
        "BED" => Some(Format::Bed),
        "SAM" => Some(Format::Sam),
        _ => None,
    }
}

fn load_from_tool(descriptor: FormatDescriptor, program: &Path, args: &[String]) -> TableResult<RecordTable> {
    let mut source = ToolSource::spawn(program, args)?;
    match RecordTable::load(descriptor, source.by_ref()) {
        Ok(table) => {
            source.finish()?;
            Ok(table)
        }
        Err(e) => {
            source.abort();
            Err(e)
        }
    }
}

/// Load a file into a table, picking the line source from its extension
///
/// BAM/CRAM go through samtools and BCF through bcftools. A SAM text file is
/// also read through samtools when regions are requested.
pub fn load_path(descriptor: FormatDescriptor, path: &Path, options: &LoadOptions) -> TableResult<RecordTable> {
    let kind = match format_of(&descriptor) {
        Some(format) => InputKind::detect(format, path)?,
        None => InputKind::Text,
    };
    info!("Load a {} file: {}", descriptor.name, path.display());

    let table = match kind {
        InputKind::Alignment => load_from_tool(descriptor, &options.samtools(), &samtools_view_args(path, options))?,
        InputKind::Text if descriptor.name == "SAM" && !options.regions.is_empty() => {
            load_from_tool(descriptor, &options.samtools(), &samtools_view_args(path, options))?
        }
        InputKind::Bcf => load_from_tool(descriptor, &options.bcftools(), &bcftools_view_args(path, options))?,
        InputKind::Text => {
            let reader = open_text(path, options.io_strategy)?;
            RecordTable::load(descriptor, LineSource::new(reader))?
        }
    };

    debug!("Loaded {} header lines and {} records", table.header().len(), table.len());
    Ok(table)
}

/// Which alignments a region query keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionMode {
    /// Alignments overlapping any part of `start..=end`
    Overlapping,
    /// Alignments covering both `start` and `end`
    #[default]
    Spanning,
}

/// Every line `samtools view` prints for one region
fn tool_lines(program: &Path, args: &[String]) -> TableResult<Vec<String>> {
    let mut source = ToolSource::spawn(program, args)?;
    let lines: io::Result<Vec<String>> = source.by_ref().collect();
    match lines {
        Ok(lines) => {
            source.finish()?;
            Ok(lines)
        }
        Err(e) => {
            source.abort();
            Err(e.into())
        }
    }
}

/// Load the alignments of one region of an indexed SAM/BAM/CRAM file
///
/// [`RegionMode::Spanning`] queries `rname:start-start` and
/// `rname:end-end` separately and keeps the lines of the first query that
/// the second one also returns, in first-query order. Header lines are
/// printed by both queries and so survive. [`RegionMode::Overlapping`] is a
/// single `rname:start-end` query.
pub fn load_sam_region(
    path: &Path,
    rname: &str,
    start: u64,
    end: u64,
    mode: RegionMode,
    options: &LoadOptions,
) -> TableResult<RecordTable> {
    InputKind::detect(Format::Sam, path)?;
    info!("Load SAM file by region: {} {}:{}-{} ({:?})", path.display(), rname, start, end, mode);

    let samtools = options.samtools();
    let view_args = |region: String| {
        let options = LoadOptions {
            regions: vec![region],
            ..options.clone()
        };
        samtools_view_args(path, &options)
    };

    let table = match mode {
        RegionMode::Overlapping => load_from_tool(
            sam::descriptor(),
            &samtools,
            &view_args(sam::region_string(rname, Some(start), Some(end))),
        )?,
        RegionMode::Spanning => {
            let at_start = tool_lines(&samtools, &view_args(sam::region_string(rname, Some(start), Some(start))))?;
            let at_end: HashSet<String> = tool_lines(&samtools, &view_args(sam::region_string(rname, Some(end), Some(end))))?
                .into_iter()
                .collect();
            let lines = at_start.into_iter().filter(|line| at_end.contains(line));
            RecordTable::load(sam::descriptor(), lines.map(Ok::<_, io::Error>))?
        }
    };

    debug!("Loaded {} records from {}:{}-{}", table.len(), rname, start, end);
    Ok(table)
}

/// `samtools view` arguments turning SAM text on stdin into a BAM file
pub fn bam_writer_args(path: &Path, options: &LoadOptions) -> Vec<String> {
    vec![
        "view".to_string(),
        "-@".to_string(),
        options.threads.to_string(),
        "-bS".to_string(),
        "-".to_string(),
        "-o".to_string(),
        path.display().to_string(),
    ]
}

/// Streams SAM text into a BAM file through `samtools view -bS`
///
/// Lines written here go to the tool's stdin. [`BamWriter::finish`] closes
/// the stream, turns a non-zero exit into [`BioTableError::ToolFailed`]
/// carrying the tool's stderr and then validates the output with
/// `samtools quickcheck`. Dropping an unfinished writer closes the stream
/// and waits for the tool without checking it.
pub struct BamWriter {
    samtools: PathBuf,
    path: PathBuf,
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr: Option<JoinHandle<String>>,
}

impl BamWriter {
    pub fn create(path: &Path, options: &LoadOptions) -> TableResult<Self> {
        let samtools = options.samtools();
        let args = bam_writer_args(path, options);
        debug!("Write STDIN into BAM: {} {}", samtools.display(), args.join(" "));

        let mut child = Command::new(&samtools)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdin not captured"))?;
        let stderr = drain_stderr(&mut child);

        Ok(Self {
            samtools,
            path: path.to_path_buf(),
            child,
            stdin: Some(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, stdin)),
            stderr,
        })
    }

    fn stdin(&mut self) -> io::Result<&mut BufWriter<ChildStdin>> {
        self.stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "BAM writer is closed"))
    }

    /// Write one SAM line; the terminator is added
    pub fn write_line(&mut self, line: &str) -> TableResult<()> {
        let stdin = self.stdin()?;
        stdin.write_all(line.as_bytes())?;
        stdin.write_all(b"\n")?;
        Ok(())
    }

    /// Write the header lines and records of a SAM table
    pub fn write_table(&mut self, table: &RecordTable) -> TableResult<()> {
        let options = WriteOptions::native(table.descriptor());
        table.write_delimited(self.stdin()?, &options)?;
        Ok(())
    }

    /// Close the stream, wait for samtools and check the output file
    pub fn finish(mut self) -> TableResult<()> {
        let flushed = match self.stdin.take() {
            Some(mut stdin) => stdin.flush(),
            None => Ok(()),
        };
        let status = self.child.wait()?;
        let stderr = join_stderr(self.stderr.take());
        if !status.success() {
            error!("STDERR from {}: {}", self.samtools.display(), stderr);
            return Err(BioTableError::ToolFailed {
                program: self.samtools.display().to_string(),
                status: status.to_string(),
                stderr,
            });
        }
        flushed?;

        let check = Command::new(&self.samtools)
            .arg("quickcheck")
            .arg(&self.path)
            .stdin(Stdio::null())
            .output()?;
        if !check.status.success() {
            return Err(BioTableError::ToolFailed {
                program: format!("{} quickcheck", self.samtools.display()),
                status: check.status.to_string(),
                stderr: String::from_utf8_lossy(&check.stderr).trim().to_string(),
            });
        }

        info!("Finish writing BAM: {}", self.path.display());
        Ok(())
    }
}

impl Drop for BamWriter {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.child.wait();
        }
    }
}

/// Write a SAM table into a BAM file
pub fn write_bam(table: &RecordTable, path: &Path, options: &LoadOptions) -> TableResult<()> {
    let mut writer = BamWriter::create(path, options)?;
    writer.write_table(table)?;
    writer.finish()
}
