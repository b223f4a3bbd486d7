//! Shared template fixtures for the integration tests

use std::io::{Cursor, Write};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Build an order-form template the way a real authoring session leaves it:
/// three sheets (order form, scratch calculations, legal boilerplate),
/// formulas pulling from the scratch sheet, a shared string table, a calc
/// chain, defined names, and a drawing part wired into the first sheet.
pub fn order_template() -> Vec<u8> {
    let sheets: &[(&str, &str)] = &[
        (
            "Order",
            concat!(
                r#"<sheetData>"#,
                r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#,
                r#"<row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" s="1"><f>Scratch!B1</f><v>PLACEHOLDER</v></c></row>"#,
                r#"<row r="4"><c r="A4" t="s"><v>2</v></c><c r="D4" s="2"><f>TODAY()</f><v>45000</v></c></row>"#,
                r#"<row r="29"><c r="J29" t="s"><v>3</v></c><c r="K29" s="3" t="s"><v>0</v></c></row>"#,
                r#"<row r="30"><c r="K30"><f>K29*VLOOKUP(TaxTable,$A$1,2)</f><v>0</v></c></row>"#,
                r#"<row r="31"><c r="K31"><f>NOW()</f><v>45000.5</v></c></row>"#,
                r#"</sheetData>"#,
                r#"<drawing r:id="rId1"/>"#,
                r#"<pageSetup paperSize="9" r:id="rId2"/>"#,
            ),
        ),
        (
            "Scratch",
            r#"<sheetData><row r="1"><c r="B1" t="s"><v>0</v></c></row></sheetData>"#,
        ),
        ("Legal", r#"<sheetData/>"#),
    ];
    let shared = &["Order Form", "Customer", "Issue date", "Total"];

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();

        let mut types = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="bin" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.printerSettings"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/><Override PartName="/xl/drawings/drawing1.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>"#
        );
        for i in 1..=sheets.len() {
            types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
        }
        types.push_str("</Types>");
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(types.as_bytes()).unwrap();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
        ).as_bytes()).unwrap();

        let mut workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#
        );
        for (i, (name, _)) in sheets.iter().enumerate() {
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                name,
                i + 1,
                i + 1
            ));
        }
        workbook.push_str(r#"</sheets><definedNames><definedName name="TaxTable">Scratch!$A$1:$B$9</definedName></definedNames></workbook>"#);
        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(workbook.as_bytes()).unwrap();

        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{REL_NS}/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="{REL_NS}/worksheet" Target="worksheets/sheet3.xml"/><Relationship Id="rId4" Type="{REL_NS}/styles" Target="styles.xml"/><Relationship Id="rId5" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId6" Type="{REL_NS}/calcChain" Target="calcChain.xml"/></Relationships>"#
        ).as_bytes()).unwrap();

        zip.start_file("xl/styles.xml", options).unwrap();
        zip.write_all(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="{MAIN_NS}"><cellXfs count="4"><xf numFmtId="0"/><xf numFmtId="0"/><xf numFmtId="14"/><xf numFmtId="44"/></cellXfs></styleSheet>"#
        ).as_bytes()).unwrap();

        let mut sst = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{MAIN_NS}" count="{}" uniqueCount="{}">"#,
            shared.len(),
            shared.len()
        );
        for s in shared {
            sst.push_str(&format!("<si><t>{s}</t></si>"));
        }
        sst.push_str("</sst>");
        zip.start_file("xl/sharedStrings.xml", options).unwrap();
        zip.write_all(sst.as_bytes()).unwrap();

        zip.start_file("xl/calcChain.xml", options).unwrap();
        zip.write_all(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><calcChain xmlns="{MAIN_NS}"><c r="B2" i="1"/><c r="K30" i="1"/></calcChain>"#
        ).as_bytes()).unwrap();

        zip.start_file("xl/drawings/drawing1.xml", options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing"/>"#).unwrap();

        zip.start_file("xl/printerSettings/printerSettings1.bin", options)
            .unwrap();
        zip.write_all(b"\x00printer\x00").unwrap();

        for (i, (_, body)) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
                .unwrap();
            zip.write_all(format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">{body}</worksheet>"#
            ).as_bytes()).unwrap();
        }

        // the order sheet's rels point at the drawing and printer settings
        zip.start_file("xl/worksheets/_rels/sheet1.xml.rels", options)
            .unwrap();
        zip.write_all(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/drawing" Target="../drawings/drawing1.xml"/><Relationship Id="rId2" Type="{REL_NS}/printerSettings" Target="../printerSettings/printerSettings1.bin"/></Relationships>"#
        ).as_bytes()).unwrap();

        zip.finish().unwrap();
    }
    buf
}
