use std::collections::HashMap;
use std::path::Path;

use lopdf::{Document, Object};
use tracing::{debug, warn};

use crate::error::FigureError;
use crate::model::{BBox, EmbeddedImage, PageData, PageSource};
use crate::pdf::content_stream::extract_xobject_placements;
use crate::pdf::image_xobject::export_image;
use crate::pdf::text_extract::{decode_pdf_string, extract_text_runs, group_into_lines};

/// lopdfで読み込んだPDF。ページ番号は1始まり、`PageSource` としては0始まり。
pub struct PdfReader {
    doc: Document,
}

impl PdfReader {
    /// PDFファイルを開いてPdfReaderを作成する。
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let doc = Document::load(path)?;
        Ok(Self { doc })
    }

    /// メモリ上のPDFから作成する。
    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self { doc })
    }

    /// 指定ページ辞書からMediaBoxを取得する（Parent経由の継承も考慮）。
    fn get_media_box(&self, dict: &lopdf::Dictionary) -> crate::error::Result<Object> {
        if let Ok(obj) = dict.get(b"MediaBox") {
            return Ok(obj.clone());
        }

        if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
            let parent_dict = self.doc.get_dictionary(*parent_id)?;
            return self.get_media_box(parent_dict);
        }

        Err(FigureError::pdf_read("MediaBox not found"))
    }

    /// 指定ページ(1-indexed)のMediaBox。PDFのユーザ空間（原点は左下）。
    pub fn page_box(&self, page_num: u32) -> crate::error::Result<BBox> {
        let page_id = self.get_page_id(page_num)?;
        let page_dict = self.doc.get_dictionary(page_id)?;

        let media_box = self.get_media_box(page_dict)?;
        let media_box_array = match &media_box {
            Object::Reference(id) => self.doc.get_object(*id)?.as_array()?,
            other => other.as_array()?,
        };
        if media_box_array.len() < 4 {
            return Err(FigureError::pdf_read("Invalid MediaBox"));
        }

        let to_f64 = |obj: &Object| -> crate::error::Result<f64> {
            match obj {
                Object::Integer(i) => Ok(*i as f64),
                Object::Real(f) => Ok(f64::from(*f)),
                _ => Err(FigureError::pdf_read("Invalid MediaBox value")),
            }
        };

        let x0 = to_f64(&media_box_array[0])?;
        let y0 = to_f64(&media_box_array[1])?;
        let x1 = to_f64(&media_box_array[2])?;
        let y1 = to_f64(&media_box_array[3])?;
        let bbox = BBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1));

        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return Err(FigureError::pdf_read(
                "Invalid MediaBox: non-positive page dimensions",
            ));
        }

        // 14,400 pt ≈ 200 in
        const PDF_MAX_DIMENSION_PT: f64 = 14_400.0;
        if bbox.width() > PDF_MAX_DIMENSION_PT || bbox.height() > PDF_MAX_DIMENSION_PT {
            return Err(FigureError::pdf_read(
                "Invalid MediaBox: page dimensions exceed PDF limits",
            ));
        }

        Ok(bbox)
    }

    /// 指定ページ(1-indexed)のページ寸法(width_pts, height_pts)を返す。
    pub fn page_dimensions(&self, page_num: u32) -> crate::error::Result<(f64, f64)> {
        let bbox = self.page_box(page_num)?;
        Ok((bbox.width(), bbox.height()))
    }

    /// 指定ページ(1-indexed)のコンテンツストリームをバイト列として返す。
    /// 複数のContentストリームがある場合は結合して返す。
    pub fn page_content_stream(&self, page_num: u32) -> crate::error::Result<Vec<u8>> {
        let page_id = self.get_page_id(page_num)?;
        Ok(self.doc.get_page_content(page_id)?)
    }

    /// 指定ページ(1-indexed)のフォントリソース名 → /BaseFont の対応。
    pub fn page_font_names(&self, page_num: u32) -> crate::error::Result<HashMap<String, String>> {
        let page_id = self.get_page_id(page_num)?;
        let fonts = self.doc.get_page_fonts(page_id)?;
        Ok(fonts
            .into_iter()
            .map(|(name, dict)| {
                let resource = String::from_utf8_lossy(&name).into_owned();
                let base_font = dict
                    .get(b"BaseFont")
                    .and_then(Object::as_name)
                    .map(|n| String::from_utf8_lossy(n).into_owned())
                    .unwrap_or_else(|_| resource.clone());
                (resource, base_font)
            })
            .collect())
    }

    /// リソース辞書のXObjectエントリからSubtype=Imageのストリームを列挙し、
    /// 各画像に対してコールバックを呼び出す共通ヘルパー。
    fn for_each_image_xobject<'a, F>(
        &'a self,
        dict: &'a lopdf::Dictionary,
        mut f: F,
    ) -> crate::error::Result<()>
    where
        F: FnMut(String, &'a lopdf::Stream),
    {
        let Ok(xobject_entry) = dict.get(b"XObject") else {
            return Ok(());
        };

        let xobject_dict = match xobject_entry {
            Object::Dictionary(d) => d,
            Object::Reference(id) => self.doc.get_object(*id).and_then(Object::as_dict)?,
            _ => return Ok(()),
        };

        for (name_bytes, value) in xobject_dict.iter() {
            let stream = match value {
                Object::Reference(id) => self.doc.get_object(*id).and_then(Object::as_stream)?,
                Object::Stream(s) => s,
                _ => continue,
            };

            if let Ok(subtype) = stream.dict.get(b"Subtype").and_then(Object::as_name)
                && subtype == b"Image"
            {
                let name = String::from_utf8_lossy(name_bytes).into_owned();
                f(name, stream);
            }
        }

        Ok(())
    }

    /// 指定ページ(1-indexed)のXObjectリソースから画像Streamオブジェクトを取得する。
    ///
    /// XObject名をキー、lopdf::Streamを値とするHashMapを返す。
    pub fn page_image_streams(
        &self,
        page_num: u32,
    ) -> crate::error::Result<HashMap<String, &lopdf::Stream>> {
        let page_id = self.get_page_id(page_num)?;
        let (resource_dict, resource_ids) = self.doc.get_page_resources(page_id)?;

        let mut streams = HashMap::new();
        if let Some(dict) = resource_dict {
            self.for_each_image_xobject(dict, |name, stream| {
                streams.insert(name, stream);
            })?;
        }
        for res_id in resource_ids {
            let dict = self.doc.get_dictionary(res_id)?;
            self.for_each_image_xobject(dict, |name, stream| {
                streams.entry(name).or_insert(stream);
            })?;
        }

        Ok(streams)
    }

    /// 文書情報辞書の /Title。
    pub fn document_title(&self) -> Option<String> {
        let info = match self.doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok()?,
            Object::Dictionary(d) => d,
            _ => return None,
        };
        match info.get(b"Title").ok()? {
            Object::String(bytes, _) => {
                let title = decode_pdf_string(bytes).trim().to_string();
                (!title.is_empty()).then_some(title)
            }
            _ => None,
        }
    }

    /// ページ番号(1-indexed)からObjectIdを取得する。
    fn get_page_id(&self, page_num: u32) -> crate::error::Result<lopdf::ObjectId> {
        let pages = self.doc.get_pages();
        pages
            .get(&page_num)
            .copied()
            .ok_or_else(|| FigureError::pdf_read(format!("page {} not found", page_num)))
    }

    /// 配置された画像XObjectを、描画順にページ座標系の画像として取り出す。
    fn page_images(
        &self,
        page_num: u32,
        content: &[u8],
        page_box: &BBox,
    ) -> crate::error::Result<Vec<EmbeddedImage>> {
        let streams = self.page_image_streams(page_num)?;
        let placements = extract_xobject_placements(content)?;

        Ok(placements
            .into_iter()
            .filter_map(|placement| {
                // Form XObjectなど画像以外のDoは対象外
                let stream = streams.get(&placement.name)?;
                let bbox = to_page_space(&placement.bbox, page_box);
                Some(match export_image(stream) {
                    Ok(exported) => EmbeddedImage::new(bbox, exported.data, exported.format),
                    Err(e) => {
                        warn!(page = page_num, name = %placement.name, error = %e, "image XObject not exportable");
                        EmbeddedImage::unreadable(Some(bbox), e.detail())
                    }
                })
            })
            .collect())
    }
}

/// PDF空間(左下原点)のBBoxをページ座標系(左上原点、y下向き)に変換する。
fn to_page_space(bbox: &BBox, page_box: &BBox) -> BBox {
    BBox::new(
        bbox.x_min - page_box.x_min,
        page_box.y_max - bbox.y_max,
        bbox.x_max - page_box.x_min,
        page_box.y_max - bbox.y_min,
    )
}

impl PageSource for PdfReader {
    fn page_count(&self) -> crate::error::Result<u32> {
        Ok(self.doc.get_pages().len() as u32)
    }

    fn load_page(&self, index: u32) -> crate::error::Result<PageData> {
        let page_num = index + 1;
        let page_box = self.page_box(page_num)?;
        let content = self.page_content_stream(page_num)?;
        let font_names = self.page_font_names(page_num).unwrap_or_default();

        let runs = extract_text_runs(&content)?;
        let lines = group_into_lines(&runs, &page_box, &font_names);
        let images = self.page_images(page_num, &content, &page_box)?;

        debug!(
            page = index,
            lines = lines.len(),
            images = images.len(),
            "page loaded"
        );

        Ok(PageData {
            index,
            width: page_box.width(),
            height: page_box.height(),
            lines,
            images,
        })
    }
}
