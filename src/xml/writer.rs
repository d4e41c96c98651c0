use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;
use std::io::Cursor;

use chrono::{NaiveDate, NaiveDateTime};

use crate::core::SaftError;
use crate::core::format::{format_amount, format_date, format_datetime};

fn xml_io(e: std::io::Error) -> SaftError {
    SaftError::Serialization(format!("XML write error: {e}"))
}

/// Thin wrapper over a quick-xml writer with the audit file's fixed
/// conventions baked in: UTF-8 declaration, two-space indent, and typed
/// helpers for amounts, counts, dates, and date-times.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, SaftError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(quick_xml::events::BytesDecl::new(
                "1.0",
                Some("UTF-8"),
                None,
            )))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, SaftError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| SaftError::Serialization(format!("XML UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, SaftError> {
        let elem = BytesStart::new(name);
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, SaftError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, SaftError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, SaftError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// Write a text element only when the value is present.
    pub fn opt_text_element(
        &mut self,
        name: &str,
        text: Option<&str>,
    ) -> Result<&mut Self, SaftError> {
        match text {
            Some(t) => self.text_element(name, t),
            None => Ok(self),
        }
    }

    /// Write a monetary value with exactly two decimal places.
    pub fn amount_element(&mut self, name: &str, amount: Decimal) -> Result<&mut Self, SaftError> {
        self.text_element(name, &format_amount(amount))
    }

    /// Write a plain decimal (quantities, percentages) as stored.
    pub fn decimal_element(&mut self, name: &str, value: Decimal) -> Result<&mut Self, SaftError> {
        self.text_element(name, &value.to_string())
    }

    pub fn count_element(&mut self, name: &str, count: u64) -> Result<&mut Self, SaftError> {
        self.text_element(name, &count.to_string())
    }

    pub fn date_element(&mut self, name: &str, date: NaiveDate) -> Result<&mut Self, SaftError> {
        self.text_element(name, &format_date(date))
    }

    pub fn datetime_element(
        &mut self,
        name: &str,
        dt: NaiveDateTime,
    ) -> Result<&mut Self, SaftError> {
        self.text_element(name, &format_datetime(dt))
    }
}
