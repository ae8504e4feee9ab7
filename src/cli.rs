use clap::Parser;

use crate::zip::ExtractOptions;

const MIB: u64 = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "cloud-unzip")]
#[command(version)]
#[command(about = "Extract files from remote ZIP archives without downloading them", long_about = None)]
#[command(after_help = "Examples:\n  \
  cloud-unzip -l https://example.com/archive.zip            list files from a remote ZIP\n  \
  cloud-unzip -t https://example.com/archive.zip            show the archive as a tree\n  \
  cloud-unzip https://example.com/archive.zip 'docs/*' -d out   extract matching entries into out/\n  \
  cloud-unzip -p https://example.com/archive.zip x.txt | more   send x.txt through a pipe")]
pub struct Cli {
    /// ZIP archive URL or local path
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,

    /// Entries to extract, `*` and `?` wildcards allowed (default: all)
    #[arg(value_name = "ENTRIES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with sizes and timestamps
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Show archive contents as a tree
    #[arg(short = 't')]
    pub tree: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "PATTERN", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Maximum number of entries extracted at once
    #[arg(short = 'j', long, value_name = "N", env = "CLOUD_UNZIP_WORKERS")]
    pub workers: Option<usize>,

    /// Compressed size in MiB from which entries are streamed in chunks
    #[arg(long, value_name = "MIB", default_value_t = 50)]
    pub chunk_threshold: u64,

    /// Size in MiB of each range request when streaming
    #[arg(long, value_name = "MIB", default_value_t = 10)]
    pub chunk_size: u64,

    /// Retry timed-out or refused connections this many times
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub retries: u32,

    /// Skip CRC-32 verification of extracted entries
    #[arg(long)]
    pub no_crc: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.archive.starts_with("http://") || self.archive.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn is_listing(&self) -> bool {
        self.list || self.verbose || self.tree
    }

    /// Extraction settings derived from the flags
    pub fn extract_options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::default()
            .with_chunk_threshold(self.chunk_threshold.saturating_mul(MIB))
            .with_chunk_size(self.chunk_size.saturating_mul(MIB))
            .with_crc_verification(!self.no_crc);
        if let Some(workers) = self.workers {
            options = options.with_workers(workers);
        }
        options
    }
}
