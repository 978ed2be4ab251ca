//! Picture-per-slide PPTX writer.
//!
//! Each page image is scaled to fit the slide while keeping its aspect ratio
//! and centered on both axes. The package holds one blank layout, one master
//! and a minimal theme, which is enough for PowerPoint and LibreOffice.

use chrono::Utc;
use quick_xml::escape::escape;
use std::io::{Seek, Write};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use crate::services::error::{LifecycleError, Result};
use crate::services::rasterizer::PageImage;

/// Slide size in EMU (English Metric Units, 914400 per inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    /// 10in x 7.5in, the default 4:3 slide
    pub const STANDARD: Canvas = Canvas {
        width: 9_144_000.0,
        height: 6_858_000.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

/// Position and size of a picture on the canvas, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale an image to fit `canvas` without distortion and center it.
///
/// Images relatively wider than the canvas take its full width; all others
/// take its full height.
pub fn fit_centered(image_width: u32, image_height: u32, canvas: Canvas) -> Placement {
    let ratio = image_width as f64 / image_height as f64;
    let (width, height) = if ratio > canvas.aspect() {
        (canvas.width, canvas.width / ratio)
    } else {
        (canvas.height * ratio, canvas.height)
    };
    Placement {
        left: (canvas.width - width) / 2.0,
        top: (canvas.height - height) / 2.0,
        width,
        height,
    }
}

struct Slide {
    png: Vec<u8>,
    placement: Placement,
}

/// In-memory deck, serialized with [`SlideDeck::write_to`].
pub struct SlideDeck {
    canvas: Canvas,
    slides: Vec<Slide>,
}

impl SlideDeck {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            slides: Vec::new(),
        }
    }

    /// Build a deck with one slide per page, in page order.
    pub fn from_pages(canvas: Canvas, pages: Vec<PageImage>) -> Result<Self> {
        let mut deck = Self::new(canvas);
        for page in pages {
            deck.add_picture_slide(page)?;
        }
        Ok(deck)
    }

    pub fn add_picture_slide(&mut self, page: PageImage) -> Result<Placement> {
        if page.width == 0 || page.height == 0 {
            return Err(LifecycleError::Conversion(
                "Page image has zero size".to_string(),
            ));
        }
        let placement = fit_centered(page.width, page.height, self.canvas);
        self.slides.push(Slide {
            png: page.png,
            placement,
        });
        Ok(placement)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W, title: &str) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let xml = FileOptions::default().compression_method(CompressionMethod::Deflated);
        // PNG data is already compressed
        let media = FileOptions::default().compression_method(CompressionMethod::Stored);

        let put = |zip: &mut ZipWriter<W>, name: &str, body: &str| -> Result<()> {
            zip.start_file(name, xml)?;
            zip.write_all(body.as_bytes())?;
            Ok(())
        };

        put(&mut zip, "[Content_Types].xml", &self.content_types())?;
        put(&mut zip, "_rels/.rels", ROOT_RELS)?;
        put(&mut zip, "docProps/core.xml", &core_props(title))?;
        put(&mut zip, "docProps/app.xml", &self.app_props())?;
        put(&mut zip, "ppt/presentation.xml", &self.presentation())?;
        put(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            &self.presentation_rels(),
        )?;
        put(&mut zip, "ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER)?;
        put(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            SLIDE_MASTER_RELS,
        )?;
        put(&mut zip, "ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT)?;
        put(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            SLIDE_LAYOUT_RELS,
        )?;
        put(&mut zip, "ppt/theme/theme1.xml", THEME)?;

        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            put(
                &mut zip,
                &format!("ppt/slides/slide{}.xml", n),
                &slide_xml(&slide.placement),
            )?;
            put(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", n),
                &slide_rels(n),
            )?;
            zip.start_file(format!("ppt/media/image{}.png", n), media)?;
            zip.write_all(&slide.png)?;
        }

        Ok(zip.finish()?)
    }

    fn content_types(&self) -> String {
        let mut overrides = String::new();
        for n in 1..=self.slides.len() {
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                n
            ));
        }
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                r#"<Default Extension="png" ContentType="image/png"/>"#,
                r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
                r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#,
                r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#,
                r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
                r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
                r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
                "{}</Types>"
            ),
            overrides
        )
    }

    fn app_props(&self) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#,
                "<Application>{}</Application><Slides>{}</Slides></Properties>"
            ),
            env!("CARGO_PKG_NAME"),
            self.slides.len()
        )
    }

    fn presentation(&self) -> String {
        let mut ids = String::new();
        for i in 0..self.slides.len() {
            ids.push_str(&format!(
                r#"<p:sldId id="{}" r:id="rId{}"/>"#,
                256 + i,
                FIRST_SLIDE_RID + i
            ));
        }
        let slide_list = if ids.is_empty() {
            String::new()
        } else {
            format!("<p:sldIdLst>{}</p:sldIdLst>", ids)
        };
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                "<p:presentation {}>",
                r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
                "{}",
                r#"<p:sldSz cx="{}" cy="{}"/>"#,
                r#"<p:notesSz cx="6858000" cy="9144000"/>"#,
                "</p:presentation>"
            ),
            NAMESPACES,
            slide_list,
            emu(self.canvas.width),
            emu(self.canvas.height)
        )
    }

    fn presentation_rels(&self) -> String {
        let mut rels = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
            r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>"#,
        ));
        for i in 0..self.slides.len() {
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                FIRST_SLIDE_RID + i,
                i + 1
            ));
        }
        rels.push_str("</Relationships>");
        rels
    }
}

/// Relationship ids 1 and 2 of the presentation part are master and theme
const FIRST_SLIDE_RID: usize = 3;

fn emu(v: f64) -> i64 {
    v.round() as i64
}

fn slide_xml(p: &Placement) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "<p:sld {}><p:cSld><p:spTree>{}",
            r#"<p:pic><p:nvPicPr><p:cNvPr id="2" name="Picture 1"/>"#,
            r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            "</p:spTree></p:cSld>",
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
        ),
        NAMESPACES,
        GROUP_SHAPE,
        emu(p.left),
        emu(p.top),
        emu(p.width),
        emu(p.height)
    )
}

fn slide_rels(n: usize) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#,
            r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image{}.png"/>"#,
            "</Relationships>"
        ),
        n
    )
}

fn core_props(title: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{}</dc:title>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>"#,
            "</cp:coreProperties>"
        ),
        escape(title),
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    )
}

const NAMESPACES: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

const GROUP_SHAPE: &str = concat!(
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
    r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>"#,
    "</Relationships>"
);

const SLIDE_MASTER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
    r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
    r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
    r#"</p:sldMaster>"#
);

const SLIDE_MASTER_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/>"#,
    "</Relationships>"
);

const SLIDE_LAYOUT: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">"#,
    r#"<p:cSld name="Blank"><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
);

const SLIDE_LAYOUT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/>"#,
    "</Relationships>"
);

const THEME: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements>"#,
    r#"<a:clrScheme name="Office">"#,
    r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>"#,
    r#"<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="Office">"#,
    r#"<a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
    r#"</a:fontScheme>"#,
    r#"<a:fmtScheme name="Office"><a:fillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:fillStyleLst><a:lnStyleLst>"#,
    r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"</a:lnStyleLst><a:effectStyleLst>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"</a:effectStyleLst><a:bgFillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:bgFillStyleLst></a:fmtScheme>"#,
    r#"</a:themeElements></a:theme>"#
);
