//! Netdata external plugin protocol output.

use bytes::{BufMut, BytesMut};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::metadata::{ChartMetadata, DimensionMetadata};

/// Renders protocol commands into a reusable buffer.
///
/// Every command is a line of space separated tokens. Free text goes in
/// single quotes. The protocol has no escapes, so single quotes in text
/// are written as double quotes and control characters, line breaks
/// included, as spaces.
/// Charts are addressed as `<type_id>.<chart_id>`.
pub struct ChartWriter {
    buffer: BytesMut,
}

impl ChartWriter {
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// `CHART`, followed by its labels unless it is obsolete.
    ///
    /// An obsolete chart tells Netdata to stop expecting data for it.
    pub fn write_chart(&mut self, type_id: &str, metadata: &ChartMetadata, obsolete: bool) {
        self.command("CHART");
        self.chart_id(type_id, &metadata.id);
        for text in [
            &metadata.name,
            &metadata.title,
            &metadata.units,
            &metadata.family,
            &metadata.context,
        ] {
            self.quoted(text);
        }
        self.word(metadata.chart_type.as_str());
        self.number(metadata.priority);
        self.number(metadata.update_every);
        self.quoted(if obsolete { "obsolete" } else { "" });
        self.end_line();

        if obsolete || metadata.labels.is_empty() {
            return;
        }

        for (key, value) in &metadata.labels {
            self.command("CLABEL");
            self.quoted(key);
            self.quoted(value);
            // source: automatically set by the collector
            self.number(1u8);
            self.end_line();
        }
        self.command("CLABEL_COMMIT");
        self.end_line();
    }

    /// `DIMENSION`, with the `obsolete` and `hidden` options as requested.
    pub fn write_dimension_definition(&mut self, dim: &DimensionMetadata, obsolete: bool) {
        self.command("DIMENSION");
        self.word(&dim.id);
        self.quoted(&dim.name);
        self.word(dim.algorithm.as_str());
        self.number(dim.multiplier);
        self.number(dim.divisor);
        self.quoted(match (obsolete, dim.hidden) {
            (true, true) => "obsolete hidden",
            (true, false) => "obsolete",
            (false, true) => "hidden",
            (false, false) => "",
        });
        self.end_line();
    }

    /// `BEGIN`, carrying the time since the previous update in microseconds.
    pub fn begin_chart(&mut self, type_id: &str, chart_id: &str, update_every: Duration) {
        self.command("BEGIN");
        self.chart_id(type_id, chart_id);
        self.number(u64::try_from(update_every.as_micros()).unwrap_or(u64::MAX));
        self.end_line();
    }

    /// `SET <dimension> = <value>`
    pub fn write_dimension(&mut self, dimension_id: &str, value: i64) {
        self.command("SET");
        self.word(dimension_id);
        self.word("=");
        self.number(value);
        self.end_line();
    }

    /// `END`, stamped with the collection time in Unix seconds.
    pub fn end_chart(&mut self, collection_time: SystemTime) {
        let secs = collection_time
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        self.command("END");
        self.number(secs);
        self.end_line();
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Take everything written so far, leaving the writer empty.
    ///
    /// The remaining capacity stays with the writer, so the next cycle
    /// reuses the allocation once the returned bytes are dropped.
    pub fn take(&mut self) -> BytesMut {
        self.buffer.split()
    }

    fn command(&mut self, name: &str) {
        self.buffer.put_slice(name.as_bytes());
    }

    fn word(&mut self, token: &str) {
        self.buffer.put_u8(b' ');
        self.buffer.put_slice(token.as_bytes());
    }

    fn chart_id(&mut self, type_id: &str, chart_id: &str) {
        self.word(type_id);
        self.buffer.put_u8(b'.');
        self.buffer.put_slice(chart_id.as_bytes());
    }

    fn quoted(&mut self, text: &str) {
        self.buffer.put_slice(b" '");
        let mut start = 0;
        for (pos, c) in text.char_indices() {
            let replacement = match c {
                '\'' => b'"',
                c if c.is_control() => b' ',
                _ => continue,
            };
            self.buffer.put_slice(text[start..pos].as_bytes());
            self.buffer.put_u8(replacement);
            start = pos + c.len_utf8();
        }
        self.buffer.put_slice(text[start..].as_bytes());
        self.buffer.put_u8(b'\'');
    }

    #[inline]
    fn number<I: itoa::Integer>(&mut self, value: I) {
        self.buffer.put_u8(b' ');
        self.buffer.put_slice(itoa::Buffer::new().format(value).as_bytes());
    }

    fn end_line(&mut self) {
        self.buffer.put_u8(b'\n');
    }
}

impl Default for ChartWriter {
    fn default() -> Self {
        Self::new()
    }
}
