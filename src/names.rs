use dashmap::DashMap;
use lazy_static::lazy_static;

// 35 glyphs, but ids index with base 34 so 'Z' never appears in practice.
const ALPHABET: &[u8] = b"123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const BASE: i64 = 34;

lazy_static! {
    static ref NAME_CACHE: DashMap<i64, String> = DashMap::new();
}

/// Deterministic `XX-XXX` display name for a pin id.
pub fn pin_name(id: i64) -> String {
    if let Some(name) = NAME_CACHE.get(&id) {
        return name.clone();
    }
    let mut name = String::with_capacity(6);
    for i in 0..5u32 {
        let index = (id / BASE.pow(i)).rem_euclid(BASE) as usize;
        name.push(ALPHABET[index] as char);
        if i == 1 {
            name.push('-');
        }
    }
    NAME_CACHE.insert(id, name.clone());
    name
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_name_format() {
        let name = pin_name(1_023_487_650_123);
        assert_eq!(name.len(), 6);
        assert_eq!(name.chars().nth(2), Some('-'));
        assert!(name
            .chars()
            .filter(|&c| c != '-')
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_name_is_deterministic() {
        assert_eq!(pin_name(0), "11-111");
        assert_eq!(pin_name(1), "21-111");
        assert_eq!(pin_name(34), "12-111");
        assert_eq!(pin_name(34), pin_name(34));
    }
}
