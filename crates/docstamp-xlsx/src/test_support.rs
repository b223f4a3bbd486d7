//! Builders for synthetic template packages used across unit tests

use std::io::{Cursor, Write};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CT_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Builds a small but structurally complete template package in memory
pub struct TemplateBuilder {
    sheets: Vec<(String, String)>,
    shared_strings: Option<Vec<String>>,
    defined_names: Option<String>,
    workbook_pr: Option<String>,
    extra_parts: Vec<(String, String)>,
    extra_overrides: Vec<(String, String)>,
    extra_workbook_rels: Vec<(String, String)>,
    sheet_rels: Vec<(usize, String)>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            shared_strings: None,
            defined_names: None,
            workbook_pr: None,
            extra_parts: Vec::new(),
            extra_overrides: Vec::new(),
            extra_workbook_rels: Vec::new(),
            sheet_rels: Vec::new(),
        }
    }

    /// Add a worksheet; `body` is the XML inside `<worksheet>`
    pub fn sheet(mut self, name: &str, body: &str) -> Self {
        self.sheets.push((name.to_string(), body.to_string()));
        self
    }

    pub fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = Some(strings.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Add a `<definedNames>` block with one print-area entry
    pub fn defined_names(mut self, inner: &str) -> Self {
        self.defined_names = Some(inner.to_string());
        self
    }

    /// Add a `<workbookPr/>` element with the given attribute text
    pub fn workbook_pr(mut self, attrs: &str) -> Self {
        self.workbook_pr = Some(attrs.to_string());
        self
    }

    /// Add an arbitrary extra part
    pub fn part(mut self, name: &str, content: &str) -> Self {
        self.extra_parts.push((name.to_string(), content.to_string()));
        self
    }

    /// Add a `[Content_Types].xml` override
    pub fn override_entry(mut self, part_name: &str, content_type: &str) -> Self {
        self.extra_overrides
            .push((part_name.to_string(), content_type.to_string()));
        self
    }

    /// Add a workbook-level relationship (type suffix, target)
    pub fn workbook_rel(mut self, rel_type: &str, target: &str) -> Self {
        self.extra_workbook_rels
            .push((rel_type.to_string(), target.to_string()));
        self
    }

    /// Attach a rels file to the 0-based `sheet_index`
    pub fn sheet_rels(mut self, sheet_index: usize, content: &str) -> Self {
        self.sheet_rels.push((sheet_index, content.to_string()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            // [Content_Types].xml
            let mut types = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="{CT_NS}"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#
            );
            for i in 0..self.sheets.len() {
                types.push_str(&format!(
                    r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                    i + 1
                ));
            }
            if self.shared_strings.is_some() {
                types.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
            }
            for (part, ctype) in &self.extra_overrides {
                types.push_str(&format!(
                    r#"<Override PartName="{}" ContentType="{}"/>"#,
                    part, ctype
                ));
            }
            types.push_str("</Types>");
            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(types.as_bytes()).unwrap();

            // _rels/.rels
            zip.start_file("_rels/.rels", options).unwrap();
            zip.write_all(format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
            ).as_bytes()).unwrap();

            // xl/workbook.xml
            let mut workbook = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">"#
            );
            if let Some(attrs) = &self.workbook_pr {
                workbook.push_str(&format!("<workbookPr {}/>", attrs));
            }
            workbook.push_str("<sheets>");
            for (i, (name, _)) in self.sheets.iter().enumerate() {
                workbook.push_str(&format!(
                    r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                    name,
                    i + 1,
                    i + 1
                ));
            }
            workbook.push_str("</sheets>");
            if let Some(inner) = &self.defined_names {
                workbook.push_str(&format!("<definedNames>{}</definedNames>", inner));
            }
            workbook.push_str("</workbook>");
            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(workbook.as_bytes()).unwrap();

            // xl/_rels/workbook.xml.rels
            let mut rels = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}">"#
            );
            let mut next_rid = 1;
            for i in 0..self.sheets.len() {
                rels.push_str(&format!(
                    r#"<Relationship Id="rId{}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                    next_rid,
                    i + 1
                ));
                next_rid += 1;
            }
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{REL_NS}/styles" Target="styles.xml"/>"#,
                next_rid
            ));
            next_rid += 1;
            if self.shared_strings.is_some() {
                rels.push_str(&format!(
                    r#"<Relationship Id="rId{}" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/>"#,
                    next_rid
                ));
                next_rid += 1;
            }
            for (rel_type, target) in &self.extra_workbook_rels {
                rels.push_str(&format!(
                    r#"<Relationship Id="rId{}" Type="{REL_NS}/{}" Target="{}"/>"#,
                    next_rid, rel_type, target
                ));
                next_rid += 1;
            }
            rels.push_str("</Relationships>");
            zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            zip.write_all(rels.as_bytes()).unwrap();

            // xl/styles.xml
            zip.start_file("xl/styles.xml", options).unwrap();
            zip.write_all(format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="{MAIN_NS}"><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellXfs></styleSheet>"#
            ).as_bytes()).unwrap();

            // xl/sharedStrings.xml
            if let Some(strings) = &self.shared_strings {
                let mut sst = format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{MAIN_NS}" count="{}" uniqueCount="{}">"#,
                    strings.len(),
                    strings.len()
                );
                for s in strings {
                    sst.push_str(&format!("<si><t>{}</t></si>", s));
                }
                sst.push_str("</sst>");
                zip.start_file("xl/sharedStrings.xml", options).unwrap();
                zip.write_all(sst.as_bytes()).unwrap();
            }

            // Worksheets
            for (i, (_, body)) in self.sheets.iter().enumerate() {
                zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
                    .unwrap();
                zip.write_all(format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">{body}</worksheet>"#
                ).as_bytes()).unwrap();
            }
            for (idx, content) in &self.sheet_rels {
                zip.start_file(
                    format!("xl/worksheets/_rels/sheet{}.xml.rels", idx + 1),
                    options,
                )
                .unwrap();
                zip.write_all(format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}">{content}</Relationships>"#
                ).as_bytes()).unwrap();
            }

            // Extra parts
            for (name, content) in &self.extra_parts {
                zip.start_file(name.as_str(), options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }

            zip.finish().unwrap();
        }
        buf
    }
}

/// Shorthand: sheets only, nothing volatile
pub fn minimal_template(sheets: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = TemplateBuilder::new();
    for (name, body) in sheets {
        builder = builder.sheet(name, body);
    }
    builder.build()
}
