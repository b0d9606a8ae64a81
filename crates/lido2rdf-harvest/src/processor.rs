//! Streaming Record Processor
//!
//! Pulls parser events from an async reader, materializes one record
//! subtree at a time, and recognizes the protocol's control elements.
//! Nothing outside the current record is retained.

use crate::error::{HarvestError, Result};
use lido2rdf_domain::TripleSink;
use lido2rdf_mapping::schema::OAI_NS;
use lido2rdf_mapping::xml::{decode_text, element_header, namespace_of, Attribute, TreeBuilder, XmlName, XmlTree};
use lido2rdf_mapping::RecordConverter;
use quick_xml::events::Event;
use quick_xml::NsReader;
use tokio::io::AsyncBufRead;
use tracing::{debug, warn};

/// Pagination token with its optional metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumptionToken {
    /// Opaque token text
    pub token: String,
    /// `completeListSize` attribute
    pub complete_list_size: Option<u64>,
    /// `cursor` attribute
    pub cursor: Option<u64>,
    /// `expirationDate` attribute
    pub expiration_date: Option<String>,
}

impl ResumptionToken {
    fn from_attributes(attributes: &[Attribute]) -> Self {
        let get = |local: &str| {
            attributes
                .iter()
                .find(|a| a.name.local == local)
                .map(|a| a.value.trim().to_string())
        };
        Self {
            token: String::new(),
            complete_list_size: get("completeListSize").and_then(|v| v.parse().ok()),
            cursor: get("cursor").and_then(|v| v.parse().ok()),
            expiration_date: get("expirationDate").filter(|v| !v.is_empty()),
        }
    }

    /// Check if the token signals the end of the list
    pub fn is_empty(&self) -> bool {
        self.token.trim().is_empty()
    }
}

/// `<error>` element reported by the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    /// `code` attribute
    pub code: String,
    /// Element text
    pub message: String,
}

/// What one page (or document) contained
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    /// Record elements converted
    pub records: usize,
    /// New triples accepted by the sink
    pub triples: usize,
    /// Pagination token, if the page carried one
    pub token: Option<ResumptionToken>,
    /// Error elements
    pub errors: Vec<ProtocolError>,
    /// Unexpected top-level elements that were discarded
    pub skipped: usize,
}

impl PageOutcome {
    /// Token for the next request; `None` when the list is complete
    pub fn next_token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|t| t.token.trim())
    }
}

/// Streams documents through a [`RecordConverter`]
#[derive(Debug, Clone, Copy)]
pub struct RecordProcessor<'c> {
    converter: &'c RecordConverter,
}

impl<'c> RecordProcessor<'c> {
    /// Create a processor
    pub fn new(converter: &'c RecordConverter) -> Self {
        Self { converter }
    }

    /// Process one document
    ///
    /// Records without an identifier are numbered from `first_ordinal`.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Xml`] if the document is not well-formed.
    pub async fn process<R, S>(&self, reader: R, first_ordinal: usize, sink: &mut S) -> Result<PageOutcome>
    where
        R: AsyncBufRead + Unpin,
        S: TripleSink,
    {
        let mut reader = NsReader::from_reader(reader);
        let mut buf = Vec::new();
        let mut page = PageState {
            converter: self.converter,
            sink,
            first_ordinal,
            outcome: PageOutcome::default(),
            frames: Vec::new(),
            record: None,
            capture: None,
            capture_depth: 0,
        };

        loop {
            let (resolved, event) = reader.read_resolved_event_into_async(&mut buf).await?;
            let namespace = namespace_of(&resolved);
            match event {
                Event::Start(ref start) => {
                    let (name, attributes) = element_header(&reader, namespace, start)?;
                    page.start(name, attributes);
                }
                Event::Empty(ref start) => {
                    let (name, attributes) = element_header(&reader, namespace, start)?;
                    page.start(name, attributes);
                    page.end()?;
                }
                Event::End(_) => page.end()?,
                Event::Text(ref text) => page.text(&decode_text(text)?),
                Event::CData(ref data) => page.text(&String::from_utf8_lossy(data)),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if page.record.is_some() {
            return Err(HarvestError::Xml("document ends inside a record".into()));
        }
        Ok(page.outcome)
    }
}

/// Open element outside any record
struct Frame {
    name: XmlName,
    envelope: bool,
    productive: bool,
}

/// Control element whose text is being collected
enum Capture {
    Token(ResumptionToken),
    Error(ProtocolError),
}

struct PageState<'a, S> {
    converter: &'a RecordConverter,
    sink: &'a mut S,
    first_ordinal: usize,
    outcome: PageOutcome,
    frames: Vec<Frame>,
    record: Option<TreeBuilder>,
    capture: Option<Capture>,
    capture_depth: usize,
}

impl<S: TripleSink> PageState<'_, S> {
    fn start(&mut self, name: XmlName, attributes: Vec<Attribute>) {
        if let Some(builder) = self.record.as_mut() {
            builder.start(name, attributes);
            return;
        }
        if self.capture.is_some() {
            self.capture_depth += 1;
            return;
        }

        if self.converter.schema().is_record(&name) {
            let mut builder = TreeBuilder::new();
            builder.start(name, attributes);
            self.record = Some(builder);
        } else if name.local == "resumptionToken" {
            self.begin_capture(Capture::Token(ResumptionToken::from_attributes(&attributes)));
        } else if name.local == "error" && name.namespace.as_deref().is_none_or(|ns| ns == OAI_NS) {
            let code = attributes
                .iter()
                .find(|a| a.name.local == "code")
                .map(|a| a.value.clone())
                .unwrap_or_default();
            self.begin_capture(Capture::Error(ProtocolError {
                code,
                message: String::new(),
            }));
        } else {
            let envelope = self.is_envelope(&name);
            self.frames.push(Frame {
                name,
                envelope,
                productive: false,
            });
        }
    }

    fn end(&mut self) -> Result<()> {
        if let Some(builder) = self.record.as_mut() {
            if builder.end() {
                if let Some(builder) = self.record.take() {
                    self.convert(builder.finish()?);
                }
            }
            return Ok(());
        }

        if self.capture.is_some() {
            if self.capture_depth > 0 {
                self.capture_depth -= 1;
                return Ok(());
            }
            match self.capture.take() {
                Some(Capture::Token(mut token)) => {
                    token.token = token.token.trim().to_string();
                    debug!(
                        token = %token.token,
                        complete_list_size = ?token.complete_list_size,
                        cursor = ?token.cursor,
                        expiration_date = ?token.expiration_date,
                        "resumption token"
                    );
                    self.outcome.token = Some(token);
                }
                Some(Capture::Error(mut error)) => {
                    error.message = error.message.trim().to_string();
                    warn!(code = %error.code, message = %error.message, "endpoint reported an error");
                    self.outcome.errors.push(error);
                }
                None => {}
            }
            self.mark_productive();
            return Ok(());
        }

        if let Some(frame) = self.frames.pop() {
            if frame.productive {
                self.mark_productive();
            } else if !frame.envelope && self.frames.last().is_none_or(|parent| parent.envelope) {
                debug!(element = %frame.name, "discarding unexpected element");
                self.outcome.skipped += 1;
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(builder) = self.record.as_mut() {
            builder.text(text);
            return;
        }
        match self.capture.as_mut() {
            Some(Capture::Token(token)) => token.token.push_str(text),
            Some(Capture::Error(error)) => error.message.push_str(text),
            None => {}
        }
    }

    fn begin_capture(&mut self, capture: Capture) {
        self.capture = Some(capture);
        self.capture_depth = 0;
    }

    fn mark_productive(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.productive = true;
        }
    }

    fn convert(&mut self, tree: XmlTree) {
        if let Some(root) = tree.root() {
            let ordinal = self.first_ordinal + self.outcome.records;
            self.outcome.triples += self.converter.convert_record(root, ordinal, self.sink);
            self.outcome.records += 1;
            self.mark_productive();
        }
    }

    /// Protocol envelope or the record schema's own wrapper elements
    fn is_envelope(&self, name: &XmlName) -> bool {
        match name.namespace.as_deref() {
            Some(OAI_NS) => true,
            Some(ns) => self.converter.schema().record_element().namespace.as_deref() == Some(ns),
            None => false,
        }
    }
}
