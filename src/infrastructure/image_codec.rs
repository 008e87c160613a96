// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageResult};

/// 解码 PNG，用于确认渲染程序输出的是合法 PNG
pub fn decode_png(data: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(data, ImageFormat::Png)
}

/// 将图像重新编码为内存中的 PNG
pub fn encode_png(image: &DynamicImage) -> ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}
