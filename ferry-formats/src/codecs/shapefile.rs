//! ESRI shapefiles, stored as a zip of the `.shp/.shx/.dbf/.cpg` set
//!
//! Geometry only. Points, multipoints, polylines and polygons are
//! supported; Z and M variants are read as plain XY.

use chrono::{Datelike, Utc};
use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::codecs::archive::zip_entries;
use crate::error::{FormatError, FormatResult};
use crate::registry::{Loader, Payload, Saver};
use crate::value::Value;

const FILE_CODE: i32 = 9994;
const VERSION: i32 = 1000;
const HEADER_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
}

impl ShapeType {
    fn code(self) -> i32 {
        match self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
        }
    }

    /// Z (+10) and M (+20) variants share the XY layout of their base type.
    fn from_code(code: i32) -> FormatResult<Self> {
        match code {
            0 => Ok(ShapeType::Null),
            1 | 11 | 21 => Ok(ShapeType::Point),
            3 | 13 | 23 => Ok(ShapeType::PolyLine),
            5 | 15 | 25 => Ok(ShapeType::Polygon),
            8 | 18 | 28 => Ok(ShapeType::MultiPoint),
            other => Err(FormatError::malformed(format!("unsupported shape type {other}"))),
        }
    }

    fn of(geometry: &Geometry<f64>) -> FormatResult<Self> {
        match geometry {
            Geometry::Point(_) => Ok(ShapeType::Point),
            Geometry::MultiPoint(_) => Ok(ShapeType::MultiPoint),
            Geometry::LineString(_) | Geometry::MultiLineString(_) => Ok(ShapeType::PolyLine),
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Ok(ShapeType::Polygon),
            _ => Err(FormatError::malformed("geometry kind cannot be stored in a shapefile")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileCodec;

impl Loader for ShapefileCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        let mut archive = ZipArchive::new(Cursor::new(payload.into_bytes()))?;
        let shp_name = archive
            .file_names()
            .find(|name| name.to_ascii_lowercase().ends_with(".shp"))
            .map(str::to_string)
            .ok_or_else(|| FormatError::malformed("archive holds no .shp file"))?;

        let mut shp = Vec::new();
        archive.by_name(&shp_name)?.read_to_end(&mut shp)?;
        Ok(Value::Geometries(read_shp(&shp)?))
    }
}

impl Saver for ShapefileCodec {
    fn save(&self, value: &Value, name: &str) -> FormatResult<Vec<u8>> {
        let geometries = match value {
            Value::Geometries(geometries) => geometries,
            other => return Err(other.mismatch("geometries")),
        };
        let stem = name.strip_suffix(".shp").unwrap_or(name);
        let files = write_shapefile(geometries)?;

        zip_entries([
            (format!("{stem}.shp"), files.shp.as_slice()),
            (format!("{stem}.shx"), files.shx.as_slice()),
            (format!("{stem}.dbf"), files.dbf.as_slice()),
            (format!("{stem}.cpg"), b"UTF-8".as_slice()),
        ])
    }
}

/// Bounds-checked little/big-endian reader over a byte slice
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn take<const N: usize>(&mut self) -> FormatResult<[u8; N]> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| FormatError::malformed("truncated shapefile"))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn i32_be(&mut self) -> FormatResult<i32> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    fn i32_le(&mut self) -> FormatResult<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn f64_le(&mut self) -> FormatResult<f64> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    fn count(&mut self) -> FormatResult<usize> {
        usize::try_from(self.i32_le()?).map_err(|_| FormatError::malformed("negative count"))
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn coord(&mut self) -> FormatResult<Coord<f64>> {
        Ok(Coord { x: self.f64_le()?, y: self.f64_le()? })
    }

    fn coords(&mut self, n: usize) -> FormatResult<Vec<Coord<f64>>> {
        (0..n).map(|_| self.coord()).collect()
    }
}

fn read_shp(data: &[u8]) -> FormatResult<Vec<Geometry<f64>>> {
    let mut header = ByteReader::new(data, 0);
    if header.i32_be()? != FILE_CODE {
        return Err(FormatError::malformed("not a shapefile"));
    }
    header.skip(20);
    let file_len = usize::try_from(header.i32_be()?)
        .map_err(|_| FormatError::malformed("negative file length"))?
        * 2;
    let end = file_len.min(data.len());

    let mut geometries = Vec::new();
    let mut offset = HEADER_LEN;
    while offset + 8 <= end {
        let mut record = ByteReader::new(data, offset);
        let _number = record.i32_be()?;
        let content_len = usize::try_from(record.i32_be()?)
            .map_err(|_| FormatError::malformed("negative record length"))?
            * 2;
        let content_start = offset + 8;
        let content = data
            .get(content_start..content_start + content_len)
            .ok_or_else(|| FormatError::malformed("truncated record"))?;
        if let Some(geometry) = read_record(content)? {
            geometries.push(geometry);
        }
        offset = content_start + content_len;
    }
    Ok(geometries)
}

fn read_record(content: &[u8]) -> FormatResult<Option<Geometry<f64>>> {
    let mut r = ByteReader::new(content, 0);
    let geometry = match ShapeType::from_code(r.i32_le()?)? {
        ShapeType::Null => return Ok(None),
        ShapeType::Point => Geometry::Point(Point(r.coord()?)),
        ShapeType::MultiPoint => {
            r.skip(32);
            let n = r.count()?;
            let points = r.coords(n)?.into_iter().map(Point).collect();
            Geometry::MultiPoint(MultiPoint(points))
        }
        ShapeType::PolyLine => {
            let parts = read_parts(&mut r)?;
            let mut lines: Vec<LineString<f64>> = parts.into_iter().map(LineString).collect();
            if lines.len() == 1 {
                Geometry::LineString(lines.remove(0))
            } else {
                Geometry::MultiLineString(MultiLineString(lines))
            }
        }
        ShapeType::Polygon => {
            let mut polygons = assemble_polygons(read_parts(&mut r)?);
            if polygons.len() == 1 {
                Geometry::Polygon(polygons.remove(0))
            } else {
                Geometry::MultiPolygon(MultiPolygon(polygons))
            }
        }
    };
    Ok(Some(geometry))
}

fn read_parts(r: &mut ByteReader<'_>) -> FormatResult<Vec<Vec<Coord<f64>>>> {
    r.skip(32);
    let num_parts = r.count()?;
    let num_points = r.count()?;
    // Each part index takes four bytes.
    let mut starts = Vec::with_capacity(num_parts.min(r.remaining() / 4));
    for _ in 0..num_parts {
        starts.push(r.count()?);
    }
    let points = r.coords(num_points)?;

    let mut parts = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let stop = starts.get(i + 1).copied().unwrap_or(points.len());
        let slice = points
            .get(start..stop)
            .ok_or_else(|| FormatError::malformed("part index out of range"))?;
        parts.push(slice.to_vec());
    }
    Ok(parts)
}

/// Positive for counter-clockwise rings.
fn signed_area(ring: &[Coord<f64>]) -> f64 {
    ring.windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum::<f64>()
        / 2.0
}

fn is_clockwise(ring: &[Coord<f64>]) -> bool {
    signed_area(ring) < 0.0
}

/// The ring wound as asked, reversed if needed.
fn wound(ring: &[Coord<f64>], clockwise: bool) -> Vec<Coord<f64>> {
    let mut out = ring.to_vec();
    if is_clockwise(ring) != clockwise {
        out.reverse();
    }
    out
}

/// Shapefiles wind outer rings clockwise and holes counter-clockwise. A
/// clockwise ring opens a new polygon, any other ring is a hole of the
/// polygon before it. Rings come back wound the geo-types way: exterior
/// counter-clockwise, holes clockwise.
fn assemble_polygons(rings: Vec<Vec<Coord<f64>>>) -> Vec<Polygon<f64>> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for ring in rings {
        if !is_clockwise(&ring) {
            if let Some((_, holes)) = polygons.last_mut() {
                holes.push(LineString(wound(&ring, true)));
                continue;
            }
        }
        polygons.push((LineString(wound(&ring, false)), Vec::new()));
    }

    polygons
        .into_iter()
        .map(|(exterior, holes)| Polygon::new(exterior, holes))
        .collect()
}

struct ShapefileParts {
    shp: Vec<u8>,
    shx: Vec<u8>,
    dbf: Vec<u8>,
}

#[derive(Clone, Copy)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn of<'a>(coords: impl IntoIterator<Item = &'a Coord<f64>>) -> Self {
        let mut bounds = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for c in coords {
            bounds.min_x = bounds.min_x.min(c.x);
            bounds.min_y = bounds.min_y.min(c.y);
            bounds.max_x = bounds.max_x.max(c.x);
            bounds.max_y = bounds.max_y.max(c.y);
        }
        if bounds.min_x > bounds.max_x {
            Bounds { min_x: 0.0, min_y: 0.0, max_x: 0.0, max_y: 0.0 }
        } else {
            bounds
        }
    }

    fn merge(self, other: Bounds) -> Self {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        for v in [self.min_x, self.min_y, self.max_x, self.max_y] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
}

/// Parts of a polyline or polygon record, in write order.
fn record_parts(geometry: &Geometry<f64>) -> Vec<Vec<Coord<f64>>> {
    match geometry {
        Geometry::LineString(line) => vec![line.0.clone()],
        Geometry::MultiLineString(lines) => lines.0.iter().map(|l| l.0.clone()).collect(),
        Geometry::Polygon(polygon) => polygon_rings(polygon),
        Geometry::MultiPolygon(polygons) => polygons.0.iter().flat_map(polygon_rings).collect(),
        _ => Vec::new(),
    }
}

/// Exterior clockwise, holes counter-clockwise.
fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Coord<f64>>> {
    std::iter::once(wound(&polygon.exterior().0, true))
        .chain(polygon.interiors().iter().map(|hole| wound(&hole.0, false)))
        .collect()
}

fn encode_record(geometry: &Geometry<f64>, shape: ShapeType) -> (Vec<u8>, Bounds) {
    let mut out = Vec::new();
    out.extend_from_slice(&shape.code().to_le_bytes());
    match geometry {
        Geometry::Point(point) => {
            out.extend_from_slice(&point.x().to_le_bytes());
            out.extend_from_slice(&point.y().to_le_bytes());
            (out, Bounds::of([&point.0]))
        }
        Geometry::MultiPoint(points) => {
            let coords: Vec<Coord<f64>> = points.0.iter().map(|p| p.0).collect();
            let bounds = Bounds::of(&coords);
            bounds.write(&mut out);
            out.extend_from_slice(&(coords.len() as i32).to_le_bytes());
            for c in &coords {
                out.extend_from_slice(&c.x.to_le_bytes());
                out.extend_from_slice(&c.y.to_le_bytes());
            }
            (out, bounds)
        }
        _ => {
            let parts = record_parts(geometry);
            let bounds = Bounds::of(parts.iter().flat_map(|p| p.iter()));
            bounds.write(&mut out);
            let num_points: usize = parts.iter().map(|p| p.len()).sum();
            out.extend_from_slice(&(parts.len() as i32).to_le_bytes());
            out.extend_from_slice(&(num_points as i32).to_le_bytes());
            let mut start = 0i32;
            for part in &parts {
                out.extend_from_slice(&start.to_le_bytes());
                start += part.len() as i32;
            }
            for c in parts.iter().flat_map(|p| p.iter()) {
                out.extend_from_slice(&c.x.to_le_bytes());
                out.extend_from_slice(&c.y.to_le_bytes());
            }
            (out, bounds)
        }
    }
}

fn main_header(shape: ShapeType, len_bytes: usize, bounds: Bounds) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(&FILE_CODE.to_be_bytes());
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&((len_bytes / 2) as i32).to_be_bytes());
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&shape.code().to_le_bytes());
    bounds.write(&mut out);
    out.extend_from_slice(&[0u8; 32]);
    out
}

fn write_shapefile(geometries: &[Geometry<f64>]) -> FormatResult<ShapefileParts> {
    let shape = match geometries.first() {
        Some(first) => ShapeType::of(first)?,
        None => ShapeType::Null,
    };

    let mut records = Vec::new();
    let mut index = Vec::new();
    let mut bounds: Option<Bounds> = None;
    let mut offset = HEADER_LEN;

    for (i, geometry) in geometries.iter().enumerate() {
        if ShapeType::of(geometry)? != shape {
            return Err(FormatError::malformed("a shapefile holds a single geometry kind"));
        }
        let (content, record_bounds) = encode_record(geometry, shape);
        bounds = Some(bounds.map_or(record_bounds, |b| b.merge(record_bounds)));

        let number = i as i32 + 1;
        let words = (content.len() / 2) as i32;
        records.extend_from_slice(&number.to_be_bytes());
        records.extend_from_slice(&words.to_be_bytes());
        records.extend_from_slice(&content);

        index.extend_from_slice(&((offset / 2) as i32).to_be_bytes());
        index.extend_from_slice(&words.to_be_bytes());
        offset += 8 + content.len();
    }

    let bounds = bounds.unwrap_or_else(|| Bounds::of(std::iter::empty()));
    let mut shp = main_header(shape, HEADER_LEN + records.len(), bounds);
    shp.extend_from_slice(&records);
    let mut shx = main_header(shape, HEADER_LEN + index.len(), bounds);
    shx.extend_from_slice(&index);

    Ok(ShapefileParts { shp, shx, dbf: write_dbf(geometries.len()) })
}

/// dBASE III table with a single numeric `id` column.
fn write_dbf(records: usize) -> Vec<u8> {
    const FIELD_WIDTH: u8 = 10;
    let header_len: u16 = 32 + 32 + 1;
    let record_len: u16 = 1 + FIELD_WIDTH as u16;

    let today = Utc::now().date_naive();
    let mut out = vec![
        0x03,
        (today.year() - 1900) as u8,
        today.month() as u8,
        today.day() as u8,
    ];
    out.extend_from_slice(&(records as u32).to_le_bytes());
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&record_len.to_le_bytes());
    out.extend_from_slice(&[0u8; 20]);

    let mut field = [0u8; 32];
    field[..2].copy_from_slice(b"id");
    field[11] = b'N';
    field[16] = FIELD_WIDTH;
    out.extend_from_slice(&field);
    out.push(0x0D);

    for i in 0..records {
        out.push(b' ');
        out.extend_from_slice(format!("{:>width$}", i, width = FIELD_WIDTH as usize).as_bytes());
    }
    out.push(0x1A);
    out
}
