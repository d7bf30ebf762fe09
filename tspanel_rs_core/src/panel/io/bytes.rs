use super::{MAGIC, VERSION};
use crate::{
    error::{bail, ensure, PanelError, Result},
    panel::{Panel, Partition, StaticCovariates},
    series::{Column, Frequency, Period, RegularSeries, Scalar, TimeIndex},
    toolkit::misc::digest,
};
use bytes::{Buf, BufMut};
use chrono::{DateTime, NaiveDateTime};
use ndarray::Array1;

const HEADER_NBYTES: usize = MAGIC.len() + 4 + 16 + 8;

fn put_str(buf: &mut impl BufMut, text: &str) {
    buf.put_u64(text.len() as u64);
    buf.put_slice(text.as_bytes());
}

fn put_timestamp(buf: &mut impl BufMut, t: &NaiveDateTime) {
    let utc = t.and_utc();
    buf.put_i64(utc.timestamp());
    buf.put_u32(utc.timestamp_subsec_nanos());
}

fn put_period(buf: &mut impl BufMut, period: &Period) {
    match period {
        Period::Fixed(nanos) => {
            buf.put_u8(0);
            buf.put_i64(*nanos);
        }
        Period::MonthStart(n) => {
            buf.put_u8(1);
            buf.put_u32(*n);
        }
        Period::MonthEnd(n) => {
            buf.put_u8(2);
            buf.put_u32(*n);
        }
    }
}

fn put_freq(buf: &mut impl BufMut, freq: &Frequency) {
    match freq {
        Frequency::Ordinal(step) => {
            buf.put_u8(0);
            buf.put_i64(*step);
        }
        Frequency::Calendar(period) => {
            buf.put_u8(1);
            put_period(buf, period);
        }
    }
}

fn put_index(buf: &mut impl BufMut, index: &TimeIndex) {
    match index {
        TimeIndex::Ordinal { start, step, len } => {
            buf.put_u8(0);
            buf.put_i64(*start);
            buf.put_i64(*step);
            buf.put_u64(*len as u64);
        }
        TimeIndex::Calendar { start, period, len } => {
            buf.put_u8(1);
            put_timestamp(buf, start);
            put_period(buf, period);
            buf.put_u64(*len as u64);
        }
    }
}

fn put_column(buf: &mut impl BufMut, column: &Column) {
    buf.put_u64(column.len() as u64);
    match column {
        Column::Float64(a) => {
            buf.put_u8(0);
            a.iter().for_each(|v| buf.put_f64(*v));
        }
        Column::Float32(a) => {
            buf.put_u8(1);
            a.iter().for_each(|v| buf.put_f32(*v));
        }
        Column::Int64(a) => {
            buf.put_u8(2);
            a.iter().for_each(|v| buf.put_i64(*v));
        }
        Column::Bool(a) => {
            buf.put_u8(3);
            a.iter().for_each(|v| buf.put_u8(*v as u8));
        }
        Column::Utf8(a) => {
            buf.put_u8(4);
            for v in a {
                match v {
                    Some(v) => {
                        buf.put_u8(1);
                        put_str(buf, v);
                    }
                    None => buf.put_u8(0),
                }
            }
        }
    }
}

fn put_series(buf: &mut impl BufMut, series: &RegularSeries) {
    put_index(buf, series.index());
    buf.put_u64(series.num_columns() as u64);
    for (name, column) in series.columns().iter().zip(series.values()) {
        put_str(buf, name);
        put_column(buf, column);
    }
}

fn put_scalar(buf: &mut impl BufMut, scalar: &Scalar) {
    match scalar {
        Scalar::Int(v) => {
            buf.put_u8(0);
            buf.put_i64(*v);
        }
        Scalar::Float(v) => {
            buf.put_u8(1);
            buf.put_f64(*v);
        }
        Scalar::Str(v) => {
            buf.put_u8(2);
            put_str(buf, v);
        }
    }
}

/// Bounds-checked reads over a payload.
struct Reader<B: Buf> {
    buf: B,
}

macro_rules! getter {
    ($name:ident, $ty:ty, $get:ident) => {
        fn $name(&mut self) -> Result<$ty> {
            self.need(std::mem::size_of::<$ty>())?;
            Ok(self.buf.$get())
        }
    };
}

impl<B: Buf> Reader<B> {
    fn need(&self, nbytes: usize) -> Result<()> {
        ensure!(
            self.buf.remaining() >= nbytes,
            Corrupt,
            "expected {nbytes} more bytes, {} left",
            self.buf.remaining()
        );
        Ok(())
    }

    getter!(u8, u8, get_u8);
    getter!(u32, u32, get_u32);
    getter!(u64, u64, get_u64);
    getter!(i64, i64, get_i64);
    getter!(f32, f32, get_f32);
    getter!(f64, f64, get_f64);

    fn len(&mut self) -> Result<usize> {
        let len = self.u64()?;
        match usize::try_from(len) {
            Ok(len) => Ok(len),
            Err(_) => bail!(Corrupt, "length {len} does not fit in memory"),
        }
    }

    /// a length prefix for `len` items of at least `item_nbytes` each
    fn count(&mut self, item_nbytes: usize) -> Result<usize> {
        let len = self.len()?;
        match len.checked_mul(item_nbytes) {
            Some(nbytes) => self.need(nbytes)?,
            None => bail!(Corrupt, "length {len} overflows"),
        }
        Ok(len)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.count(1)?;
        let bytes = self.buf.copy_to_bytes(len);
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(text),
            Err(e) => bail!(Corrupt, "invalid utf8 string: {e}"),
        }
    }

    fn timestamp(&mut self) -> Result<NaiveDateTime> {
        let secs = self.i64()?;
        let nanos = self.u32()?;
        match DateTime::from_timestamp(secs, nanos) {
            Some(t) => Ok(t.naive_utc()),
            None => bail!(Corrupt, "invalid timestamp {secs}s {nanos}ns"),
        }
    }

    fn period(&mut self) -> Result<Period> {
        Ok(match self.u8()? {
            0 => Period::Fixed(self.i64()?),
            1 => Period::MonthStart(self.u32()?),
            2 => Period::MonthEnd(self.u32()?),
            tag => bail!(Corrupt, "unknown period tag {tag}"),
        })
    }

    fn freq(&mut self) -> Result<Frequency> {
        Ok(match self.u8()? {
            0 => Frequency::Ordinal(self.i64()?),
            1 => Frequency::Calendar(self.period()?),
            tag => bail!(Corrupt, "unknown frequency tag {tag}"),
        })
    }

    fn index(&mut self) -> Result<TimeIndex> {
        let index = match self.u8()? {
            0 => {
                let start = self.i64()?;
                let step = self.i64()?;
                TimeIndex::ordinal(start, step, self.len()?)
            }
            1 => {
                let start = self.timestamp()?;
                let period = self.period()?;
                TimeIndex::calendar(start, period, self.len()?)
            }
            tag => bail!(Corrupt, "unknown index tag {tag}"),
        };
        index.map_err(|e| PanelError::Corrupt(e.to_string()))
    }

    fn column(&mut self) -> Result<Column> {
        let len = self.len()?;
        let tag = self.u8()?;
        let item_nbytes = match tag {
            0 | 2 => 8,
            1 => 4,
            _ => 1,
        };
        match len.checked_mul(item_nbytes) {
            Some(nbytes) => self.need(nbytes)?,
            None => bail!(Corrupt, "column length {len} overflows"),
        }
        Ok(match tag {
            0 => Column::Float64((0..len).map(|_| self.buf.get_f64()).collect()),
            1 => Column::Float32((0..len).map(|_| self.buf.get_f32()).collect()),
            2 => Column::Int64((0..len).map(|_| self.buf.get_i64()).collect()),
            3 => Column::Bool((0..len).map(|_| self.buf.get_u8() != 0).collect()),
            4 => {
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(match self.u8()? {
                        0 => None,
                        _ => Some(self.string()?),
                    });
                }
                Column::Utf8(Array1::from_vec(values))
            }
            tag => bail!(Corrupt, "unknown column tag {tag}"),
        })
    }

    fn series(&mut self) -> Result<RegularSeries> {
        let index = self.index()?;
        let num_columns = self.count(8)?;
        let mut columns = Vec::with_capacity(num_columns);
        let mut values = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            columns.push(self.string()?);
            values.push(self.column()?);
        }
        RegularSeries::new(index, columns, values).map_err(|e| PanelError::Corrupt(e.to_string()))
    }

    fn scalar(&mut self) -> Result<Scalar> {
        Ok(match self.u8()? {
            0 => Scalar::Int(self.i64()?),
            1 => Scalar::Float(self.f64()?),
            2 => Scalar::Str(self.string()?),
            tag => bail!(Corrupt, "unknown scalar tag {tag}"),
        })
    }
}

impl Panel {
    fn payload(&self) -> Vec<u8> {
        let mut payload: Vec<u8> = Vec::new();
        put_freq(&mut payload, &self.freq);
        for partition in Partition::TIME_VARYING {
            match self.slot(partition) {
                Some(series) => {
                    payload.put_u8(1);
                    put_series(&mut payload, series);
                }
                None => payload.put_u8(0),
            }
        }
        let statics = self.static_covariates.as_ref();
        payload.put_u64(statics.map_or(0, |m| m.len()) as u64);
        for (key, value) in statics.into_iter().flatten() {
            put_str(&mut payload, key);
            put_scalar(&mut payload, value);
        }
        payload
    }

    /// Serialize into a self-describing buffer: magic, version, md5 digest of the payload,
    /// payload length, payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut bytes: Vec<u8> = Vec::with_capacity(HEADER_NBYTES + payload.len());
        bytes.put_slice(MAGIC);
        bytes.put_u32(VERSION);
        bytes.put_slice(&digest(&payload));
        bytes.put_u64(payload.len() as u64);
        bytes.put_slice(&payload);
        bytes
    }

    /// Deserialize bytes produced by [`Panel::to_bytes`], verifying the checksum and the panel
    /// invariants.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Panel> {
        ensure!(
            bytes.len() >= HEADER_NBYTES,
            Corrupt,
            "expected at least {HEADER_NBYTES} header bytes, got {}",
            bytes.len()
        );
        let magic = bytes.copy_to_bytes(MAGIC.len());
        ensure!(magic[..] == MAGIC[..], Corrupt, "not a panel buffer");
        let version = bytes.get_u32();
        ensure!(version == VERSION, Corrupt, "unsupported version {version}");
        let mut checksum = [0u8; 16];
        bytes.copy_to_slice(&mut checksum);
        let len = bytes.get_u64();
        ensure!(
            bytes.remaining() as u64 == len,
            Corrupt,
            "expected a {len} byte payload, got {}",
            bytes.remaining()
        );
        ensure!(digest(bytes) == checksum, Corrupt, "checksum mismatch");

        let mut reader = Reader { buf: bytes };
        let freq = reader.freq()?;
        let mut parts: Vec<Option<RegularSeries>> = Vec::with_capacity(3);
        for _ in Partition::TIME_VARYING {
            parts.push(match reader.u8()? {
                0 => None,
                _ => Some(reader.series()?),
            });
        }
        let num_statics = reader.count(2)?;
        let mut statics = StaticCovariates::new();
        for _ in 0..num_statics {
            let key = reader.string()?;
            statics.insert(key, reader.scalar()?);
        }
        ensure!(
            !reader.buf.has_remaining(),
            Corrupt,
            "{} trailing bytes",
            reader.buf.remaining()
        );
        let mut parts = parts.into_iter();
        let mut panel = Panel {
            target: parts.next().flatten(),
            observed: parts.next().flatten(),
            known: parts.next().flatten(),
            static_covariates: Some(statics).filter(|m| !m.is_empty()),
            freq,
        };
        panel.freq = panel
            .validate()
            .map_err(|e| PanelError::Corrupt(e.to_string()))?;
        Ok(panel)
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::panel::tests::get_test_panel;
    use crate::series::{
        period::parse_timestamp, tests::ordinal_series, Dtype, IndexedColumn, TimeKey,
    };

    pub(in crate::panel) fn get_mixed_panel() -> Panel {
        let mut panel = get_test_panel();
        let keys: Vec<TimeKey> = (1..=5)
            .map(|day| TimeKey::Calendar(parse_timestamp(&format!("2023-01-0{day}")).unwrap()))
            .collect();
        let label = IndexedColumn::new(
            keys[..2].to_vec(),
            Column::Utf8(Array1::from_vec(vec![Some("a".to_string()), None])),
        )
        .unwrap();
        panel.set("label", label).unwrap();
        let flag = IndexedColumn::new(
            keys,
            Column::from_bool(vec![true, false, false, true, false]),
        )
        .unwrap();
        panel.set("flag", flag).unwrap();
        panel
            .write("store", Scalar::Int(7).into(), Partition::Static)
            .unwrap();
        panel
    }

    #[test]
    fn test_bytes_round_trip() {
        let panel = get_mixed_panel();
        let bytes = panel.to_bytes();
        let loaded = Panel::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, panel);
        assert!(loaded.dtypes().contains(&("flag".to_string(), Dtype::Bool)));
        assert_eq!(loaded.to_bytes(), bytes);
        assert_eq!(loaded.freq(), panel.freq());

        let ordinal = Panel::new(
            Some(ordinal_series(5, 3, &[("x", vec![1.0, f64::NAN])])),
            None,
            None,
            None,
        )
        .unwrap();
        let loaded = Panel::from_bytes(&ordinal.to_bytes()).unwrap();
        assert_eq!(loaded.target().map(|t| t.index()), ordinal.target().map(|t| t.index()));
        assert!(loaded.target().unwrap().column("x").unwrap().is_missing(1));
    }

    #[test]
    fn test_corrupted_bytes() {
        let panel = get_test_panel();
        let mut bytes = panel.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            Panel::from_bytes(&bytes),
            Err(PanelError::Corrupt(_))
        ));
        assert!(matches!(
            Panel::from_bytes(&bytes[..10]),
            Err(PanelError::Corrupt(_))
        ));
        let mut bytes = panel.to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Panel::from_bytes(&bytes),
            Err(PanelError::Corrupt(_))
        ));
    }
}
