use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use image_cdn_rewriter::{DocumentRewriter, SiteTable, classify};
use same_file::is_same_file;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Rewrite WordPress image references in an HTML page or stylesheet to go through the image CDN.
#[derive(Parser)]
#[command(name = "image-cdn-rewriter", version)]
struct Cli {
  /// Input document; reads stdin when omitted
  input: Option<PathBuf>,

  /// URL the document was served from; its host selects the site record
  #[arg(long)]
  url: Url,

  /// Site table (.json, .yaml or .yml); defaults to image-cdn.json in the current directory
  #[arg(long)]
  sites: Option<PathBuf>,

  /// Content type of the document
  #[arg(long, default_value = "text/html")]
  content_type: String,

  /// Origin status code; anything but 200 is passed through
  #[arg(long, default_value_t = 200)]
  status: u16,

  /// Output file; writes stdout when omitted
  #[arg(short, long)]
  output: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  if let (Some(input), Some(output)) = (&cli.input, &cli.output) {
    ensure_distinct(input, output)?;
  }

  let table = match &cli.sites {
    Some(path) => SiteTable::from_path(path)?,
    None => SiteTable::discover(Path::new(".")),
  };

  let input: Box<dyn Read> = match &cli.input {
    Some(path) => Box::new(BufReader::new(
      File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
    )),
    None => Box::new(io::stdin().lock()),
  };
  let mut output: Box<dyn Write> = match &cli.output {
    Some(path) => Box::new(BufWriter::new(
      File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
    )),
    None => Box::new(io::stdout().lock()),
  };

  match classify(cli.status, Some(&cli.content_type), cli.url.path()) {
    Ok(kind) => {
      let host = cli.url.host_str().unwrap_or_default();
      DocumentRewriter::for_host(&table, host).rewrite(kind, input, &mut output, Some(&cli.url))?;
    }
    Err(reason) => {
      info!("passing {} through: {reason}", cli.url);
      let mut input = input;
      io::copy(&mut input, &mut output).context("failed to copy document")?;
      output.flush().context("failed to flush document")?;
    }
  }

  Ok(())
}

fn ensure_distinct(input: &Path, output: &Path) -> Result<()> {
  if output.exists() && is_same_file(input, output).unwrap_or(false) {
    bail!(
      "refusing to write {} over its own input",
      output.display()
    );
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_writing_over_the_input() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("page.html");
    std::fs::write(&page, "<p>hi</p>").unwrap();

    assert!(ensure_distinct(&page, &page).is_err());
    assert!(ensure_distinct(&page, &dir.path().join("out.html")).is_ok());
  }

  #[test]
  fn parses_arguments() {
    let cli = Cli::try_parse_from([
      "image-cdn-rewriter",
      "page.html",
      "--url",
      "https://example.com/blog/",
      "--content-type",
      "text/css",
      "-o",
      "out.css",
    ])
    .unwrap();

    assert_eq!(cli.url.host_str(), Some("example.com"));
    assert_eq!(cli.status, 200);
    assert_eq!(cli.content_type, "text/css");
    assert_eq!(cli.output, Some(PathBuf::from("out.css")));
  }
}
