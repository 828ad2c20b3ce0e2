use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::metadata::{MetadataError, ReportSink, RunSummary};
use crate::parsers::browser::Visit;
use crate::search::SearchEvent;
use crate::sessions::Session;
use crate::stats::DomainCount;

/// One JSON object per line, one file per record stream.
pub struct JsonlSink {
    visits: Option<BufWriter<File>>,
    sessions: BufWriter<File>,
    domains: BufWriter<File>,
    searches: BufWriter<File>,
    terms: BufWriter<File>,
    run: BufWriter<File>,
}

#[derive(Serialize)]
struct SessionRecord<'a> {
    #[serde(flatten)]
    session: &'a Session,
    session_length_secs: i64,
}

#[derive(Serialize)]
struct SearchTermRecord<'a> {
    term: &'a str,
    count: u64,
}

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>, MetadataError> {
    Ok(BufWriter::new(File::create(dir.join(name))?))
}

fn write_line<T: Serialize>(writer: &mut BufWriter<File>, value: &T) -> Result<(), MetadataError> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}

impl JsonlSink {
    pub fn new(run_output_dir: &Path, include_visits: bool) -> Result<Self, MetadataError> {
        let meta_dir = run_output_dir.join("metadata");
        std::fs::create_dir_all(&meta_dir)?;
        let visits = if include_visits {
            Some(create(&meta_dir, "visits.jsonl")?)
        } else {
            None
        };
        Ok(Self {
            visits,
            sessions: create(&meta_dir, "sessions.jsonl")?,
            domains: create(&meta_dir, "domain_counts.jsonl")?,
            searches: create(&meta_dir, "searches.jsonl")?,
            terms: create(&meta_dir, "search_terms.jsonl")?,
            run: create(&meta_dir, "run_summary.jsonl")?,
        })
    }
}

impl ReportSink for JsonlSink {
    fn record_visit(&mut self, visit: &Visit) -> Result<(), MetadataError> {
        match self.visits.as_mut() {
            Some(writer) => write_line(writer, visit),
            None => Ok(()),
        }
    }

    fn record_session(&mut self, session: &Session) -> Result<(), MetadataError> {
        let record = SessionRecord {
            session,
            session_length_secs: session.duration().num_seconds(),
        };
        write_line(&mut self.sessions, &record)
    }

    fn record_domain_count(&mut self, count: &DomainCount) -> Result<(), MetadataError> {
        write_line(&mut self.domains, count)
    }

    fn record_search(&mut self, event: &SearchEvent) -> Result<(), MetadataError> {
        write_line(&mut self.searches, event)
    }

    fn record_search_term(&mut self, term: &str, count: u64) -> Result<(), MetadataError> {
        write_line(&mut self.terms, &SearchTermRecord { term, count })
    }

    fn record_run_summary(&mut self, summary: &RunSummary) -> Result<(), MetadataError> {
        write_line(&mut self.run, summary)
    }

    fn flush(&mut self) -> Result<(), MetadataError> {
        if let Some(writer) = self.visits.as_mut() {
            writer.flush()?;
        }
        self.sessions.flush()?;
        self.domains.flush()?;
        self.searches.flush()?;
        self.terms.flush()?;
        self.run.flush()?;
        Ok(())
    }
}
