//! netCDF classic format
//!
//! Reads CDF-1 and CDF-2 (64-bit offset) files, writes CDF-1. Record
//! variables along the unlimited dimension are supported on both paths.
//! All multi-byte values are big-endian.

use crate::error::{FormatError, FormatResult};
use crate::registry::{Loader, Payload, Saver};
use crate::value::Value;

const MAGIC: &[u8; 3] = b"CDF";
const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;
const STREAMING: u32 = 0xFFFF_FFFF;

/// Typed values of one variable or attribute
#[derive(Debug, Clone, PartialEq)]
pub enum NcData {
    Byte(Vec<i8>),
    Char(Vec<u8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl NcData {
    fn type_code(&self) -> u32 {
        match self {
            NcData::Byte(_) => 1,
            NcData::Char(_) => 2,
            NcData::Short(_) => 3,
            NcData::Int(_) => 4,
            NcData::Float(_) => 5,
            NcData::Double(_) => 6,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NcData::Byte(v) => v.len(),
            NcData::Char(v) => v.len(),
            NcData::Short(v) => v.len(),
            NcData::Int(v) => v.len(),
            NcData::Float(v) => v.len(),
            NcData::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values widened to f64; characters are returned as their byte value.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            NcData::Byte(v) => v.iter().map(|&x| f64::from(x)).collect(),
            NcData::Char(v) => v.iter().map(|&x| f64::from(x)).collect(),
            NcData::Short(v) => v.iter().map(|&x| f64::from(x)).collect(),
            NcData::Int(v) => v.iter().map(|&x| f64::from(x)).collect(),
            NcData::Float(v) => v.iter().map(|&x| f64::from(x)).collect(),
            NcData::Double(v) => v.clone(),
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            NcData::Char(v) => Some(String::from_utf8_lossy(v).trim_end_matches('\0').to_string()),
            _ => None,
        }
    }

    fn empty_like(type_code: u32) -> FormatResult<Self> {
        Ok(match type_code {
            1 => NcData::Byte(Vec::new()),
            2 => NcData::Char(Vec::new()),
            3 => NcData::Short(Vec::new()),
            4 => NcData::Int(Vec::new()),
            5 => NcData::Float(Vec::new()),
            6 => NcData::Double(Vec::new()),
            other => return Err(FormatError::malformed(format!("unknown nc_type {other}"))),
        })
    }

    /// Append `count` values read from `r`.
    fn extend_from(&mut self, r: &mut Reader<'_>, count: usize) -> FormatResult<()> {
        match self {
            NcData::Byte(v) => {
                for b in r.bytes(count)? {
                    v.push(*b as i8);
                }
            }
            NcData::Char(v) => v.extend_from_slice(r.bytes(count)?),
            NcData::Short(v) => {
                for chunk in r.bytes(byte_len(count, 2)?)?.chunks_exact(2) {
                    v.push(i16::from_be_bytes([chunk[0], chunk[1]]));
                }
            }
            NcData::Int(v) => {
                for chunk in r.bytes(byte_len(count, 4)?)?.chunks_exact(4) {
                    v.push(i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
                }
            }
            NcData::Float(v) => {
                for chunk in r.bytes(byte_len(count, 4)?)?.chunks_exact(4) {
                    v.push(f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
                }
            }
            NcData::Double(v) => {
                for chunk in r.bytes(byte_len(count, 8)?)?.chunks_exact(8) {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(chunk);
                    v.push(f64::from_be_bytes(raw));
                }
            }
        }
        Ok(())
    }

    /// Write values `[start, start + count)`.
    fn write_range(&self, out: &mut Vec<u8>, start: usize, count: usize) {
        let end = start + count;
        match self {
            NcData::Byte(v) => out.extend(v[start..end].iter().map(|&x| x as u8)),
            NcData::Char(v) => out.extend_from_slice(&v[start..end]),
            NcData::Short(v) => v[start..end].iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            NcData::Int(v) => v[start..end].iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            NcData::Float(v) => v[start..end].iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            NcData::Double(v) => v[start..end].iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
        }
    }
}

fn type_size(type_code: u32) -> usize {
    match type_code {
        1 | 2 => 1,
        3 => 2,
        4 | 5 => 4,
        _ => 8,
    }
}

fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

fn overflow() -> FormatError {
    FormatError::malformed("netCDF sizes overflow")
}

fn byte_len(count: usize, size: usize) -> FormatResult<usize> {
    count.checked_mul(size).ok_or_else(overflow)
}

fn checked_pad4(n: usize) -> FormatResult<usize> {
    n.checked_add(3).map(|v| v & !3).ok_or_else(overflow)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    /// Current record count for the unlimited dimension
    pub len: usize,
    pub unlimited: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: NcData,
}

impl Attribute {
    pub fn text(name: impl Into<String>, value: &str) -> Self {
        Self {
            name: name.into(),
            value: NcData::Char(value.as_bytes().to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Dimension names, slowest varying first
    pub dimensions: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub data: NcData,
}

impl Variable {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Everything a classic netCDF file holds, data included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub dimensions: Vec<Dimension>,
    pub attributes: Vec<Attribute>,
    pub variables: Vec<Variable>,
}

impl Dataset {
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn record_count(&self) -> usize {
        self.dimensions
            .iter()
            .find(|d| d.unlimited)
            .map(|d| d.len)
            .unwrap_or(0)
    }

    fn dimension_index(&self, name: &str) -> FormatResult<usize> {
        self.dimensions
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| FormatError::malformed(format!("unknown dimension `{name}`")))
    }

    fn is_record_variable(&self, variable: &Variable) -> bool {
        variable
            .dimensions
            .first()
            .and_then(|name| self.dimension(name))
            .map(|d| d.unlimited)
            .unwrap_or(false)
    }

    /// Values per record for record variables, total values otherwise.
    fn slab_len(&self, variable: &Variable) -> FormatResult<usize> {
        let skip = usize::from(self.is_record_variable(variable));
        variable.dimensions.iter().skip(skip).try_fold(1usize, |acc, name| -> FormatResult<usize> {
            let idx = self.dimension_index(name)?;
            acc.checked_mul(self.dimensions[idx].len).ok_or_else(overflow)
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfCodec;

impl Loader for NetCdfCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        Ok(Value::Dataset(read(&payload.into_bytes())?))
    }
}

impl Saver for NetCdfCodec {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        match value {
            Value::Dataset(dataset) => write(dataset),
            other => Err(other.mismatch("dataset")),
        }
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, n: usize) -> FormatResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| FormatError::malformed("truncated netCDF file"))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Header counts bounded by what the rest of the file could hold.
    fn capacity(&self, count: usize, min_element: usize) -> usize {
        count.min(self.remaining() / min_element)
    }

    fn u32(&mut self) -> FormatResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> FormatResult<u64> {
        let b = self.bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    fn len(&mut self) -> FormatResult<usize> {
        Ok(self.u32()? as usize)
    }

    fn name(&mut self) -> FormatResult<String> {
        let n = self.len()?;
        let raw = self.bytes(n)?;
        self.bytes(pad4(n) - n)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| FormatError::malformed("name is not valid UTF-8"))
    }

    /// Tag and element count of a header list; `ABSENT` gives zero.
    fn list_header(&mut self, expected: u32) -> FormatResult<usize> {
        let tag = self.u32()?;
        let count = self.len()?;
        if tag == 0 && count == 0 {
            return Ok(0);
        }
        if tag != expected {
            return Err(FormatError::malformed(format!("unexpected header tag {tag:#x}")));
        }
        Ok(count)
    }

    fn attributes(&mut self) -> FormatResult<Vec<Attribute>> {
        let count = self.list_header(NC_ATTRIBUTE)?;
        let mut attributes = Vec::with_capacity(self.capacity(count, 12));
        for _ in 0..count {
            let name = self.name()?;
            let type_code = self.u32()?;
            let n = self.len()?;
            let mut value = NcData::empty_like(type_code)?;
            value.extend_from(self, n)?;
            let used = n * type_size(type_code);
            self.bytes(pad4(used) - used)?;
            attributes.push(Attribute { name, value });
        }
        Ok(attributes)
    }
}

struct VarHeader {
    variable: Variable,
    type_code: u32,
    begin: usize,
}

pub fn read(data: &[u8]) -> FormatResult<Dataset> {
    let mut r = Reader { data, pos: 0 };
    if r.bytes(3)? != MAGIC {
        return Err(FormatError::malformed("not a netCDF classic file"));
    }
    let wide_offsets = match r.bytes(1)?[0] {
        1 => false,
        2 => true,
        v => return Err(FormatError::malformed(format!("unsupported netCDF version {v}"))),
    };
    let numrecs = r.u32()?;

    let dim_count = r.list_header(NC_DIMENSION)?;
    let mut dimensions = Vec::with_capacity(r.capacity(dim_count, 8));
    for _ in 0..dim_count {
        let name = r.name()?;
        let len = r.len()?;
        dimensions.push(Dimension { name, len, unlimited: len == 0 });
    }

    let attributes = r.attributes()?;

    let var_count = r.list_header(NC_VARIABLE)?;
    let mut headers = Vec::with_capacity(r.capacity(var_count, 28));
    for _ in 0..var_count {
        let name = r.name()?;
        let rank = r.len()?;
        let mut dims = Vec::with_capacity(r.capacity(rank, 4));
        for _ in 0..rank {
            let id = r.len()?;
            let dim = dimensions
                .get(id)
                .ok_or_else(|| FormatError::malformed(format!("bad dimension id {id}")))?;
            dims.push(dim.name.clone());
        }
        let var_attributes = r.attributes()?;
        let type_code = r.u32()?;
        let _vsize = r.u32()?;
        let begin = if wide_offsets { r.u64()? as usize } else { r.u32()? as usize };
        headers.push(VarHeader {
            variable: Variable {
                name,
                dimensions: dims,
                attributes: var_attributes,
                data: NcData::empty_like(type_code)?,
            },
            type_code,
            begin,
        });
    }

    let mut dataset = Dataset { dimensions, attributes, variables: Vec::new() };

    let record_vars: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| dataset.is_record_variable(&h.variable))
        .map(|(i, _)| i)
        .collect();

    let numrecs = if numrecs == STREAMING {
        infer_record_count(&dataset, &headers, &record_vars, data.len())?
    } else {
        numrecs as usize
    };
    if let Some(dim) = dataset.dimensions.iter_mut().find(|d| d.unlimited) {
        dim.len = numrecs;
    }

    let recsize = record_size(&dataset, &headers, &record_vars)?;

    for (i, header) in headers.iter_mut().enumerate() {
        let slab = dataset.slab_len(&header.variable)?;
        if record_vars.contains(&i) {
            if slab == 0 {
                continue;
            }
            for rec in 0..numrecs {
                let pos = rec
                    .checked_mul(recsize)
                    .and_then(|o| o.checked_add(header.begin))
                    .ok_or_else(overflow)?;
                let mut at = Reader { data, pos };
                header.variable.data.extend_from(&mut at, slab)?;
            }
        } else {
            let mut at = Reader { data, pos: header.begin };
            header.variable.data.extend_from(&mut at, slab)?;
        }
    }

    dataset.variables = headers.into_iter().map(|h| h.variable).collect();
    Ok(dataset)
}

/// Bytes per record across every record variable. A lone record variable
/// is stored without padding.
fn record_size(dataset: &Dataset, headers: &[VarHeader], record_vars: &[usize]) -> FormatResult<usize> {
    if let [only] = record_vars {
        let h = &headers[*only];
        return byte_len(dataset.slab_len(&h.variable)?, type_size(h.type_code));
    }
    record_vars.iter().try_fold(0usize, |acc, &i| -> FormatResult<usize> {
        let h = &headers[i];
        let slab = checked_pad4(byte_len(dataset.slab_len(&h.variable)?, type_size(h.type_code))?)?;
        acc.checked_add(slab).ok_or_else(overflow)
    })
}

fn infer_record_count(
    dataset: &Dataset,
    headers: &[VarHeader],
    record_vars: &[usize],
    file_len: usize,
) -> FormatResult<usize> {
    let recsize = record_size(dataset, headers, record_vars)?;
    let start = record_vars.iter().map(|&i| headers[i].begin).min();
    Ok(match start {
        Some(start) if recsize > 0 && file_len > start => (file_len - start) / recsize,
        _ => 0,
    })
}

struct Writer {
    out: Vec<u8>,
}

impl Writer {
    fn u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    fn len(&mut self, v: usize) -> FormatResult<()> {
        let v = u32::try_from(v).map_err(|_| FormatError::malformed("value too large for CDF-1"))?;
        self.u32(v);
        Ok(())
    }

    fn pad(&mut self) {
        while self.out.len() % 4 != 0 {
            self.out.push(0);
        }
    }

    fn name(&mut self, name: &str) -> FormatResult<()> {
        self.len(name.len())?;
        self.out.extend_from_slice(name.as_bytes());
        self.pad();
        Ok(())
    }

    fn attributes(&mut self, attributes: &[Attribute]) -> FormatResult<()> {
        if attributes.is_empty() {
            self.u32(0);
            self.u32(0);
            return Ok(());
        }
        self.u32(NC_ATTRIBUTE);
        self.len(attributes.len())?;
        for attribute in attributes {
            self.name(&attribute.name)?;
            self.u32(attribute.value.type_code());
            self.len(attribute.value.len())?;
            attribute.value.write_range(&mut self.out, 0, attribute.value.len());
            self.pad();
        }
        Ok(())
    }
}

fn validate(dataset: &Dataset) -> FormatResult<()> {
    if dataset.dimensions.iter().filter(|d| d.unlimited).count() > 1 {
        return Err(FormatError::malformed("at most one unlimited dimension is allowed"));
    }
    for variable in &dataset.variables {
        for (i, name) in variable.dimensions.iter().enumerate() {
            let idx = dataset.dimension_index(name)?;
            if dataset.dimensions[idx].unlimited && i != 0 {
                return Err(FormatError::malformed(format!(
                    "`{}` uses the unlimited dimension in position {i}",
                    variable.name
                )));
            }
        }
        let records = if dataset.is_record_variable(variable) {
            dataset.record_count()
        } else {
            1
        };
        let expected = byte_len(dataset.slab_len(variable)?, records)?;
        if variable.data.len() != expected {
            return Err(FormatError::malformed(format!(
                "`{}` holds {} values, its shape needs {expected}",
                variable.name,
                variable.data.len()
            )));
        }
    }
    Ok(())
}

fn write_header(dataset: &Dataset, begins: &[usize]) -> FormatResult<Vec<u8>> {
    let mut w = Writer { out: Vec::new() };
    w.out.extend_from_slice(MAGIC);
    w.out.push(1);
    w.len(dataset.record_count())?;

    if dataset.dimensions.is_empty() {
        w.u32(0);
        w.u32(0);
    } else {
        w.u32(NC_DIMENSION);
        w.len(dataset.dimensions.len())?;
        for dim in &dataset.dimensions {
            w.name(&dim.name)?;
            w.len(if dim.unlimited { 0 } else { dim.len })?;
        }
    }

    w.attributes(&dataset.attributes)?;

    if dataset.variables.is_empty() {
        w.u32(0);
        w.u32(0);
    } else {
        w.u32(NC_VARIABLE);
        w.len(dataset.variables.len())?;
        for (variable, &begin) in dataset.variables.iter().zip(begins) {
            w.name(&variable.name)?;
            w.len(variable.dimensions.len())?;
            for name in &variable.dimensions {
                w.len(dataset.dimension_index(name)?)?;
            }
            w.attributes(&variable.attributes)?;
            let type_code = variable.data.type_code();
            w.u32(type_code);
            w.len(pad4(dataset.slab_len(variable)? * type_size(type_code)))?;
            w.len(begin)?;
        }
    }
    Ok(w.out)
}

pub fn write(dataset: &Dataset) -> FormatResult<Vec<u8>> {
    validate(dataset)?;

    // Begin offsets are fixed width, so a first pass sizes the header.
    let header_len = write_header(dataset, &vec![0; dataset.variables.len()])?.len();

    let is_record: Vec<bool> = dataset
        .variables
        .iter()
        .map(|v| dataset.is_record_variable(v))
        .collect();
    let slab_bytes: Vec<usize> = dataset
        .variables
        .iter()
        .map(|v| -> FormatResult<usize> { Ok(dataset.slab_len(v)? * type_size(v.data.type_code())) })
        .collect::<FormatResult<_>>()?;
    let record_count = is_record.iter().filter(|&&r| r).count();

    let mut begins = vec![0usize; dataset.variables.len()];
    let mut offset = header_len;
    for i in (0..begins.len()).filter(|&i| !is_record[i]) {
        begins[i] = offset;
        offset += pad4(slab_bytes[i]);
    }
    let mut record_offset = offset;
    for i in (0..begins.len()).filter(|&i| is_record[i]) {
        begins[i] = record_offset;
        record_offset += if record_count == 1 { slab_bytes[i] } else { pad4(slab_bytes[i]) };
    }

    let mut w = Writer { out: write_header(dataset, &begins)? };

    for (i, variable) in dataset.variables.iter().enumerate() {
        if !is_record[i] {
            variable.data.write_range(&mut w.out, 0, variable.data.len());
            w.pad();
        }
    }

    for rec in 0..dataset.record_count() {
        for (i, variable) in dataset.variables.iter().enumerate() {
            if !is_record[i] {
                continue;
            }
            let slab = slab_bytes[i] / type_size(variable.data.type_code());
            variable.data.write_range(&mut w.out, rec * slab, slab);
            if record_count > 1 {
                w.pad();
            }
        }
    }
    Ok(w.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn sample() -> Dataset {
        Dataset {
            dimensions: vec![
                Dimension { name: "time".into(), len: 2, unlimited: true },
                Dimension { name: "lat".into(), len: 2, unlimited: false },
                Dimension { name: "lon".into(), len: 3, unlimited: false },
            ],
            attributes: vec![
                Attribute::text("title", "ferry test"),
                Attribute { name: "version".into(), value: NcData::Int(vec![2]) },
            ],
            variables: vec![
                Variable {
                    name: "lat".into(),
                    dimensions: vec!["lat".into()],
                    attributes: vec![Attribute::text("units", "degrees_north")],
                    data: NcData::Float(vec![45.0, 46.5]),
                },
                Variable {
                    name: "mask".into(),
                    dimensions: vec!["lat".into(), "lon".into()],
                    attributes: vec![],
                    data: NcData::Byte(vec![1, 0, 1, -1, 0, 1]),
                },
                Variable {
                    name: "temperature".into(),
                    dimensions: vec!["time".into(), "lat".into(), "lon".into()],
                    attributes: vec![Attribute::text("units", "K")],
                    data: NcData::Double((0..12).map(|v| 270.0 + f64::from(v)).collect()),
                },
                Variable {
                    name: "flag".into(),
                    dimensions: vec!["time".into()],
                    attributes: vec![],
                    data: NcData::Short(vec![7, -3]),
                },
            ],
        }
    }

    #[test]
    fn test_round_trip_with_record_variables() {
        let dataset = sample();
        let saved = NetCdfCodec.save(&Value::Dataset(dataset.clone()), "t.nc").unwrap();
        assert_eq!(&saved[..4], b"CDF\x01");
        let loaded = NetCdfCodec.load(Payload::Binary(Bytes::from(saved))).unwrap();
        assert_eq!(loaded, Value::Dataset(dataset));
    }

    #[test]
    fn test_single_record_variable_is_unpadded() {
        let dataset = Dataset {
            dimensions: vec![Dimension { name: "t".into(), len: 3, unlimited: true }],
            attributes: vec![],
            variables: vec![Variable {
                name: "b".into(),
                dimensions: vec!["t".into()],
                attributes: vec![],
                data: NcData::Byte(vec![1, 2, 3]),
            }],
        };
        let saved = write(&dataset).unwrap();
        assert!(saved.ends_with(&[1, 2, 3]));
        assert_eq!(read(&saved).unwrap(), dataset);
    }

    #[test]
    fn test_empty_dataset() {
        let saved = write(&Dataset::default()).unwrap();
        assert_eq!(saved.len(), 4 + 4 + 8 * 3);
        assert_eq!(read(&saved).unwrap(), Dataset::default());
    }

    #[test]
    fn test_accessors() {
        let dataset = sample();
        assert_eq!(dataset.record_count(), 2);
        assert_eq!(
            dataset.attribute("title").and_then(|a| a.value.as_text()),
            Some("ferry test".to_string())
        );
        let temp = dataset.variable("temperature").unwrap();
        assert_eq!(temp.data.to_f64()[11], 281.0);
        assert_eq!(
            temp.attribute("units").and_then(|a| a.value.as_text()).as_deref(),
            Some("K")
        );
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let mut dataset = sample();
        dataset.variables[0].data = NcData::Float(vec![1.0]);
        assert!(write(&dataset).is_err());
    }

    #[test]
    fn test_reads_64bit_offset_header() {
        // version 2, no records, one dimension, one 2-value int variable
        let mut raw = Vec::new();
        raw.extend_from_slice(b"CDF\x02");
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&NC_DIMENSION.to_be_bytes());
        raw.extend_from_slice(&1u32.to_be_bytes());
        raw.extend_from_slice(&1u32.to_be_bytes());
        raw.extend_from_slice(b"x\0\0\0");
        raw.extend_from_slice(&2u32.to_be_bytes());
        raw.extend_from_slice(&[0u8; 8]);
        raw.extend_from_slice(&NC_VARIABLE.to_be_bytes());
        raw.extend_from_slice(&1u32.to_be_bytes());
        raw.extend_from_slice(&1u32.to_be_bytes());
        raw.extend_from_slice(b"v\0\0\0");
        raw.extend_from_slice(&1u32.to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&[0u8; 8]);
        raw.extend_from_slice(&4u32.to_be_bytes());
        raw.extend_from_slice(&8u32.to_be_bytes());
        let begin = raw.len() as u64 + 8;
        raw.extend_from_slice(&begin.to_be_bytes());
        raw.extend_from_slice(&5i32.to_be_bytes());
        raw.extend_from_slice(&(-6i32).to_be_bytes());

        let dataset = read(&raw).unwrap();
        assert_eq!(dataset.variable("v").unwrap().data, NcData::Int(vec![5, -6]));
    }

    #[test]
    fn test_rejects_hdf5() {
        assert!(read(b"\x89HDF\r\n\x1a\n").is_err());
    }

    #[test]
    fn test_huge_dimension_count_is_an_error() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"CDF\x01");
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&NC_DIMENSION.to_be_bytes());
        raw.extend_from_slice(&0x7FFF_FFFFu32.to_be_bytes());
        assert!(read(&raw).is_err());
    }

    #[test]
    fn test_huge_attribute_and_variable_counts_are_errors() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"CDF\x01");
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&[0u8; 8]);
        raw.extend_from_slice(&NC_ATTRIBUTE.to_be_bytes());
        raw.extend_from_slice(&u32::MAX.to_be_bytes());
        assert!(read(&raw).is_err());

        let mut raw = Vec::new();
        raw.extend_from_slice(b"CDF\x01");
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&[0u8; 16]);
        raw.extend_from_slice(&NC_VARIABLE.to_be_bytes());
        raw.extend_from_slice(&u32::MAX.to_be_bytes());
        assert!(read(&raw).is_err());
    }

    #[test]
    fn test_overflowing_shape_is_an_error() {
        // four dimensions of u32::MAX, one double variable over all of them
        let mut raw = Vec::new();
        raw.extend_from_slice(b"CDF\x01");
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&NC_DIMENSION.to_be_bytes());
        raw.extend_from_slice(&4u32.to_be_bytes());
        for name in [b"a", b"b", b"c", b"d"] {
            raw.extend_from_slice(&1u32.to_be_bytes());
            raw.extend_from_slice(name);
            raw.extend_from_slice(&[0u8; 3]);
            raw.extend_from_slice(&u32::MAX.to_be_bytes());
        }
        raw.extend_from_slice(&[0u8; 8]);
        raw.extend_from_slice(&NC_VARIABLE.to_be_bytes());
        raw.extend_from_slice(&1u32.to_be_bytes());
        raw.extend_from_slice(&1u32.to_be_bytes());
        raw.extend_from_slice(b"v\0\0\0");
        raw.extend_from_slice(&4u32.to_be_bytes());
        for id in 0u32..4 {
            raw.extend_from_slice(&id.to_be_bytes());
        }
        raw.extend_from_slice(&[0u8; 8]);
        raw.extend_from_slice(&6u32.to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());

        let err = read(&raw).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }
}
