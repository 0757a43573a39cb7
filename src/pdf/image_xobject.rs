// 画像XObjectのストリームを単体の画像ファイルとして書き出す

use std::io::{Cursor, Read};

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::Object;

use crate::error::FigureError;

/// 画像XObjectのメタデータ
#[derive(Debug, Clone)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: String,
    pub filters: Vec<String>,
}

/// 書き出した画像データと形式（拡張子として使う小文字の名前）
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedImage {
    pub data: Vec<u8>,
    pub format: &'static str,
}

/// 画像XObjectのストリームから画像メタデータを読み取る。
pub fn read_image_meta(stream: &lopdf::Stream) -> crate::error::Result<ImageMeta> {
    let dict = &stream.dict;

    let width = dict_get_u32(dict, b"Width")?;
    let height = dict_get_u32(dict, b"Height")?;
    // BitsPerComponent: missing keyの場合のみデフォルト8、型エラーは伝播
    let bits_per_component = match dict.get(b"BitsPerComponent") {
        Ok(_) => dict_get_u32(dict, b"BitsPerComponent")? as u8,
        Err(_) => 8,
    };

    let color_space = match dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
        // [/ICCBased 5 0 R] などは先頭の名前だけを見る
        Ok(Object::Array(arr)) => arr
            .first()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default(),
        _ => String::new(),
    };

    let filters = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect(),
        _ => Vec::new(),
    };

    Ok(ImageMeta {
        width,
        height,
        bits_per_component,
        color_space,
        filters,
    })
}

/// 辞書からu32値を取得するヘルパー（負の値はエラー）
fn dict_get_u32(dict: &lopdf::Dictionary, key: &[u8]) -> crate::error::Result<u32> {
    let key_name = String::from_utf8_lossy(key);
    match dict.get(key) {
        Ok(Object::Integer(i)) => u32::try_from(*i).map_err(|_| {
            FigureError::image_extraction(format!("value out of u32 range for {key_name}: {i}"))
        }),
        Ok(Object::Real(f)) if *f >= 0.0 && *f <= u32::MAX as f32 => Ok(*f as u32),
        Ok(other) => Err(FigureError::image_extraction(format!(
            "expected integer for {key_name}, got {other:?}"
        ))),
        Err(_) => Err(FigureError::image_extraction(format!(
            "missing required key: {key_name}"
        ))),
    }
}

/// 画像XObjectを単体の画像ファイルとして書き出す。
///
/// - DCTDecode: JPEGデータをそのまま
/// - JPXDecode: JPEG 2000データをそのまま
/// - FlateDecode / 非圧縮: 8bit DeviceRGB・DeviceGray のraw pixelをPNGへ再エンコード
///
/// それ以外のフィルタや色空間は `ImageExtractionError`。
pub fn export_image(stream: &lopdf::Stream) -> crate::error::Result<ExportedImage> {
    let meta = read_image_meta(stream)?;
    let raw = &stream.content;

    match meta.filters.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["DCTDecode"] => Ok(ExportedImage {
            data: raw.clone(),
            format: "jpeg",
        }),
        ["JPXDecode"] => Ok(ExportedImage {
            data: raw.clone(),
            format: "jp2",
        }),
        ["FlateDecode"] => {
            let decompressed = inflate(raw)?;
            encode_png(&decode_raw(&decompressed, &meta)?)
        }
        [] => encode_png(&decode_raw(raw, &meta)?),
        other => Err(FigureError::image_extraction(format!(
            "unsupported image filter chain: {other:?}"
        ))),
    }
}

/// FlateDecode (zlib) の展開
fn inflate(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| FigureError::image_extraction(format!("FlateDecode error: {e}")))?;
    Ok(decompressed)
}

/// 色空間の成分数。ICCBasedなどはデータ長から推定する。
fn components(meta: &ImageMeta, data_len: usize) -> Option<usize> {
    let pixels = (meta.width as usize) * (meta.height as usize);
    match meta.color_space.as_str() {
        "DeviceRGB" | "CalRGB" => Some(3),
        "DeviceGray" | "CalGray" => Some(1),
        "ICCBased" | "" if pixels > 0 => match data_len / pixels {
            3 => Some(3),
            1 => Some(1),
            _ => None,
        },
        _ => None,
    }
}

/// Raw pixelデータからDynamicImageを構築
fn decode_raw(data: &[u8], meta: &ImageMeta) -> crate::error::Result<DynamicImage> {
    let (w, h) = (meta.width, meta.height);

    if meta.bits_per_component != 8 {
        return Err(FigureError::image_extraction(format!(
            "unsupported bits per component: {}",
            meta.bits_per_component
        )));
    }
    let Some(n) = components(meta, data.len()) else {
        return Err(FigureError::image_extraction(format!(
            "unsupported color space: {}",
            meta.color_space
        )));
    };

    let expected = (w as usize) * (h as usize) * n;
    if data.len() < expected {
        return Err(FigureError::image_extraction(format!(
            "pixel data too short: expected {expected}, got {}",
            data.len()
        )));
    }
    let pixels = data[..expected].to_vec();
    let img = match n {
        3 => RgbImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
        _ => GrayImage::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
    };
    img.ok_or_else(|| FigureError::image_extraction("failed to create image from raw data"))
}

fn encode_png(img: &DynamicImage) -> crate::error::Result<ExportedImage> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(ExportedImage {
        data: buf,
        format: "png",
    })
}
