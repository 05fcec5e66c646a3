//! Byte-exact codec for the extended-attribute archive extension (`§6`):
//! `xattr_hdr` followed by one or two `xattr_buf` sections (a second one
//! only when the attribute is a hard link to another attribute), then the
//! attribute payload as a normal archive entry.

const VERSION: &[u8] = b"1.0";

pub const HDR_LEN: usize = 7 + 10 + 10 + 10;

/// Fixed extended-attribute header. `size` is the size of the header plus
/// every variable-sized section that follows it; `component_len`/
/// `link_component_len` are the encoded lengths of the primary and
/// (optional) link `xattr_buf` sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XattrHdr {
    pub size: u32,
    pub component_len: u32,
    pub link_component_len: u32,
}

impl XattrHdr {
    pub fn encode(&self) -> [u8; HDR_LEN] {
        let mut buf = [0u8; HDR_LEN];
        write_nul_padded(&mut buf[0..7], VERSION);
        write_decimal_right(&mut buf[7..17], u64::from(self.size));
        write_decimal_right(&mut buf[17..27], u64::from(self.component_len));
        write_decimal_right(&mut buf[27..37], u64::from(self.link_component_len));
        buf
    }

    pub fn decode(buf: &[u8; HDR_LEN]) -> Option<Self> {
        if &buf[0..3] != VERSION {
            return None;
        }
        Some(Self {
            size: read_decimal(&buf[7..17]) as u32,
            component_len: read_decimal(&buf[17..27]) as u32,
            link_component_len: read_decimal(&buf[27..37]) as u32,
        })
    }
}

/// Variable-sized pathing section: `filepath\0attrpath\0[attrpath\0]...`.
/// `names` is the file path followed by one or more attribute path
/// components (more than one only for a nested/recursive attribute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XattrBuf {
    pub typeflag: u8,
    pub names: Vec<String>,
}

impl XattrBuf {
    fn encoded_names(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for name in &self.names {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        out
    }

    pub fn encode(&self) -> Vec<u8> {
        let names = self.encoded_names();
        let mut out = Vec::with_capacity(8 + names.len());
        let mut namesz_field = [0u8; 7];
        write_decimal_right(&mut namesz_field, names.len() as u64);
        out.extend_from_slice(&namesz_field);
        out.push(self.typeflag);
        out.extend_from_slice(&names);
        out
    }

    /// Decodes one `xattr_buf` from the front of `buf`, returning it plus
    /// the number of bytes consumed.
    pub fn decode(buf: &[u8]) -> Option<(Self, usize)> {
        if buf.len() < 8 {
            return None;
        }
        let namesz = read_decimal(&buf[0..7]) as usize;
        let typeflag = buf[7];
        let names_start = 8;
        let names_end = names_start + namesz;
        if buf.len() < names_end {
            return None;
        }
        let names = buf[names_start..names_end]
            .split(|&b| b == 0)
            .filter(|s| !s.is_empty())
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();
        Some((Self { typeflag, names }, names_end))
    }
}

fn write_nul_padded(field: &mut [u8], value: &[u8]) {
    let n = value.len().min(field.len());
    field[..n].copy_from_slice(&value[..n]);
}

fn write_decimal_right(field: &mut [u8], value: u64) {
    field.fill(b' ');
    let text = value.to_string();
    let n = text.len().min(field.len());
    let start = field.len() - n;
    field[start..].copy_from_slice(&text.as_bytes()[text.len() - n..]);
}

fn read_decimal(field: &[u8]) -> u64 {
    let text: String = field.iter().map(|&b| b as char).collect();
    text.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xattr_hdr_round_trips() {
        let hdr = XattrHdr {
            size: 128,
            component_len: 40,
            link_component_len: 0,
        };
        let encoded = hdr.encode();
        let decoded = XattrHdr::decode(&encoded).unwrap();
        assert_eq!(decoded, hdr);
    }

    #[test]
    fn xattr_hdr_version_field_is_nul_padded() {
        let hdr = XattrHdr {
            size: 1,
            component_len: 1,
            link_component_len: 0,
        };
        let encoded = hdr.encode();
        assert_eq!(&encoded[0..3], b"1.0");
        assert_eq!(encoded[3], 0);
    }

    #[test]
    fn xattr_buf_round_trips_single_attribute() {
        let original = XattrBuf {
            typeflag: b'0',
            names: vec!["dir/file".to_string(), "user.comment".to_string()],
        };
        let encoded = original.encode();
        let (decoded, consumed) = XattrBuf::decode(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, original);
    }

    #[test]
    fn xattr_buf_supports_nested_link_component() {
        let original = XattrBuf {
            typeflag: b'E',
            names: vec![
                "dir/file".to_string(),
                "user.a".to_string(),
                "user.b".to_string(),
            ],
        };
        let encoded = original.encode();
        let (decoded, _) = XattrBuf::decode(&encoded).unwrap();
        assert_eq!(decoded.names.len(), 3);
    }

    #[test]
    fn decimal_fields_are_right_justified_space_padded() {
        let mut field = [0u8; 10];
        write_decimal_right(&mut field, 42);
        assert_eq!(&field, b"        42");
    }
}
