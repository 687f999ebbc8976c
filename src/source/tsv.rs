use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, Read, Seek, SeekFrom, Take},
    path::{Path, PathBuf},
};

use crate::{
    error::{IoContext, SourceError},
    nsa::DATA_VERSION,
    DataSourceVersion, Error, GenomeAssembly, Result, SaHeader,
};

/// A byte range of the file and the line number it starts on
#[derive(Clone, Copy, Debug)]
pub(crate) struct Span {
    start: u64,
    len: u64,
    first_line: usize,
}

/// A tab-separated source file with `#key=value` header lines
///
/// The body is scanned once on open. When indexed by chromosome, the byte
/// range of each chromosome's lines is recorded so it can be re-read later
/// without scanning the whole file.
pub(crate) struct TsvFile {
    path: PathBuf,
    header: SaHeader,
    body: Span,
    chromosomes: Vec<(String, Span)>,
}
impl TsvFile {
    pub(crate) fn open(path: &Path, index_chromosomes: bool) -> Result<Self> {
        let file = File::open(path).with_path("open", path)?;
        let mut reader = BufReader::new(file);

        let mut fields = HashMap::new();
        let mut body: Option<Span> = None;
        let mut chromosomes: Vec<(String, Span)> = Vec::new();

        let mut line = String::new();
        let mut offset = 0u64;
        let mut line_no = 0usize;
        loop {
            line.clear();
            let n = reader.read_line(&mut line).with_path("read", path)?;
            if n == 0 {
                break;
            }
            line_no += 1;
            let start = offset;
            offset += n as u64;

            if body.is_none() {
                if let Some(field) = line.strip_prefix('#') {
                    if let Some((key, value)) = field.trim_end().split_once('=') {
                        fields.insert(key.trim().to_string(), value.trim().to_string());
                    }
                    continue;
                }
                body = Some(Span {
                    start,
                    len: 0,
                    first_line: line_no,
                });
            }
            if !index_chromosomes || is_skipped(&line) {
                continue;
            }

            let chrom = line.split('\t').next().unwrap_or_default().trim_end();
            match chromosomes.last_mut() {
                Some((name, span)) if name == chrom => span.len = offset - span.start,
                _ => {
                    if chromosomes.iter().any(|(name, _)| name == chrom) {
                        return Err(malformed(
                            path,
                            line_no,
                            format!("lines for {chrom} are not contiguous"),
                        ));
                    }
                    chromosomes.push((
                        chrom.to_string(),
                        Span {
                            start,
                            len: offset - start,
                            first_line: line_no,
                        },
                    ));
                }
            }
        }

        let body = match body {
            Some(span) => Span {
                len: offset - span.start,
                ..span
            },
            None => Span {
                start: offset,
                len: 0,
                first_line: line_no + 1,
            },
        };
        let header = parse_header(path, &fields)?;
        Ok(Self {
            path: path.to_path_buf(),
            header,
            body,
            chromosomes,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn header(&self) -> &SaHeader {
        &self.header
    }

    pub(crate) fn chromosome_names(&self) -> Vec<String> {
        self.chromosomes.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Lines of the whole body
    pub(crate) fn body_lines(&self) -> Result<TsvLines> {
        self.lines(self.body)
    }

    /// Lines of one chromosome, or `None` if the file has none
    pub(crate) fn chromosome_lines(&self, reference: &str) -> Result<Option<TsvLines>> {
        self.chromosomes
            .iter()
            .find(|(name, _)| name == reference)
            .map(|&(_, span)| self.lines(span))
            .transpose()
    }

    fn lines(&self, span: Span) -> Result<TsvLines> {
        let mut file = File::open(&self.path).with_path("open", &self.path)?;
        file.seek(SeekFrom::Start(span.start))
            .with_path("seek", &self.path)?;
        Ok(TsvLines {
            reader: BufReader::new(file.take(span.len)),
            path: self.path.clone(),
            line_no: span.first_line,
            buf: String::new(),
        })
    }
}

fn is_skipped(line: &str) -> bool {
    line.starts_with('#') || line.trim().is_empty()
}

/// Data lines of a span with their 1-based line numbers
pub(crate) struct TsvLines {
    reader: BufReader<Take<File>>,
    path: PathBuf,
    line_no: usize,
    buf: String,
}
impl Iterator for TsvLines {
    type Item = Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let line_no = self.line_no;
                    self.line_no += 1;
                    if is_skipped(&self.buf) {
                        continue;
                    }
                    let line = self.buf.trim_end_matches(['\n', '\r']);
                    return Some(Ok((line_no, line.to_string())));
                }
                Err(e) => {
                    return Some(Err(Error::FileIo {
                        operation: "read",
                        path: self.path.clone(),
                        source: e,
                    }))
                }
            }
        }
    }
}

pub(crate) fn malformed(path: &Path, line: usize, message: impl Into<String>) -> Error {
    SourceError::Malformed {
        path: path.display().to_string(),
        line,
        message: message.into(),
    }
    .into()
}

/// Splits a data line into exactly `N` fields; the last field keeps any remaining tabs
pub(crate) fn split_fields<'a, const N: usize>(
    path: &Path,
    line_no: usize,
    line: &'a str,
) -> Result<[&'a str; N]> {
    let mut fields = [""; N];
    let mut parts = line.splitn(N, '\t');
    for (idx, field) in fields.iter_mut().enumerate() {
        *field = parts.next().ok_or_else(|| {
            malformed(path, line_no, format!("expected {N} tab-separated fields, found {idx}"))
        })?;
    }
    Ok(fields)
}

/// Parses a 1-based position
pub(crate) fn parse_position(path: &Path, line_no: usize, field: &str) -> Result<u32> {
    match field.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(malformed(path, line_no, format!("invalid position: {field}"))),
        Ok(position) => Ok(position),
    }
}

fn required<'a>(path: &Path, fields: &'a HashMap<String, String>, key: &'static str) -> Result<&'a str> {
    fields.get(key).map(String::as_str).ok_or_else(|| {
        SourceError::MissingHeaderKey {
            path: path.display().to_string(),
            key,
        }
        .into()
    })
}

fn optional<'a>(fields: &'a HashMap<String, String>, key: &str) -> &'a str {
    fields.get(key).map(String::as_str).unwrap_or_default()
}

fn parse_header(path: &Path, fields: &HashMap<String, String>) -> Result<SaHeader> {
    let name = required(path, fields, "name")?;
    let assembly = required(path, fields, "assembly")?
        .parse::<GenomeAssembly>()
        .map_err(|e| malformed(path, 0, e))?;
    let release_date = match fields.get("releaseDate") {
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| malformed(path, 0, format!("invalid releaseDate: {value}")))?,
        None => 0,
    };
    let is_misc = matches!(optional(fields, "isMisc"), "true" | "True" | "1");
    let data_version = match fields.get("dataVersion") {
        Some(value) => value
            .parse::<u16>()
            .map_err(|_| malformed(path, 0, format!("invalid dataVersion: {value}")))?,
        None => DATA_VERSION,
    };

    Ok(SaHeader::new(
        DataSourceVersion::new(
            name,
            optional(fields, "version"),
            release_date,
            optional(fields, "description"),
            is_misc,
        ),
        optional(fields, "reference"),
        assembly,
        data_version,
    ))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Write;

    use super::*;

    /// Writes `contents` to `name` inside `dir`
    pub(crate) fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_header_and_spans() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(
            dir.path(),
            "dbsnp.tsv",
            "#name=dbSNP\n#version=151\n#releaseDate=1500000000\n#assembly=GRCh37\n\
             chr1\t10\ta\nchr1\t20\tb\n# comment\nchr2\t5\tc\n",
        );
        let tsv = TsvFile::open(&path, true)?;
        assert_eq!(tsv.header().name(), "dbSNP");
        assert_eq!(tsv.header().data_source.version, "151");
        assert_eq!(tsv.header().data_source.release_date, 1_500_000_000);
        assert_eq!(tsv.header().assembly, GenomeAssembly::GRCh37);
        assert_eq!(tsv.chromosome_names(), vec!["chr1", "chr2"]);

        let chr1 = tsv.chromosome_lines("chr1")?.unwrap().collect::<Result<Vec<_>>>()?;
        assert_eq!(chr1, vec![(5, "chr1\t10\ta".to_string()), (6, "chr1\t20\tb".to_string())]);
        let chr2 = tsv.chromosome_lines("chr2")?.unwrap().collect::<Result<Vec<_>>>()?;
        assert_eq!(chr2, vec![(8, "chr2\t5\tc".to_string())]);
        assert!(tsv.chromosome_lines("chr3")?.is_none());
        assert_eq!(tsv.body_lines()?.count(), 3);
        Ok(())
    }

    #[test]
    fn test_missing_header_key() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(dir.path(), "bad.tsv", "#version=1\nchr1\t1\tx\n");
        let err = TsvFile::open(&path, true).err().unwrap();
        assert!(err.to_string().contains("name"));
        Ok(())
    }

    #[test]
    fn test_non_contiguous_chromosome() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(
            dir.path(),
            "split.tsv",
            "#name=x\n#assembly=GRCh38\nchr1\t1\ta\nchr2\t1\tb\nchr1\t2\tc\n",
        );
        let err = TsvFile::open(&path, true).err().unwrap();
        assert!(err.to_string().contains("split.tsv:5"));
        Ok(())
    }

    #[test]
    fn test_split_fields() -> Result<()> {
        let path = Path::new("x.tsv");
        let [a, b, c] = split_fields::<3>(path, 1, "chr1\t10\tpay\tload")?;
        assert_eq!((a, b, c), ("chr1", "10", "pay\tload"));
        assert!(split_fields::<3>(path, 1, "chr1\t10").is_err());
        assert!(parse_position(path, 1, "0").is_err());
        assert!(parse_position(path, 1, "-4").is_err());
        assert_eq!(parse_position(path, 1, "42")?, 42);
        Ok(())
    }
}
