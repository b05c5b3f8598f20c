use crate::protocol::catalog::{memory::Unit, Filter, Laptop, Memory};

/// Normalizes a memory quantity to bits so quantities in different units
/// compare correctly. Unknown units count as zero.
pub fn memory_bits(memory: &Memory) -> u64 {
    let shift = match memory.unit() {
        Unit::Bit => 0,
        Unit::Byte => 3,
        Unit::Kilobyte => 13,
        Unit::Megabyte => 23,
        Unit::Gigabyte => 33,
        Unit::Terabyte => 43,
        Unit::Unknown => return 0,
    };
    memory.value.saturating_mul(1u64 << shift)
}

/// Every bound of the filter must hold: price at most the maximum, and cores,
/// clock and RAM at least the minimums.
pub fn is_qualified(filter: &Filter, laptop: &Laptop) -> bool {
    if laptop.price_usd > filter.max_price_usd {
        return false;
    }

    let (cores, ghz) = laptop
        .cpu
        .as_ref()
        .map(|cpu| (cpu.number_cores, cpu.min_ghz))
        .unwrap_or((0, 0.0));
    if cores < filter.min_cpu_cores || ghz < filter.min_cpu_ghz {
        return false;
    }

    let min_ram = filter.min_ram.as_ref().map(memory_bits).unwrap_or(0);
    let ram = laptop.ram.as_ref().map(memory_bits).unwrap_or(0);
    ram >= min_ram
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::catalog::Cpu;

    fn gigabytes(value: u64) -> Memory {
        Memory {
            value,
            unit: Unit::Gigabyte as i32,
        }
    }

    fn laptop(price_usd: f64, cores: u32, ghz: f64, ram: Memory) -> Laptop {
        Laptop {
            price_usd,
            cpu: Some(Cpu {
                number_cores: cores,
                min_ghz: ghz,
                ..Default::default()
            }),
            ram: Some(ram),
            ..Default::default()
        }
    }

    fn filter() -> Filter {
        Filter {
            max_price_usd: 3000.0,
            min_cpu_cores: 4,
            min_cpu_ghz: 2.5,
            min_ram: Some(gigabytes(8)),
        }
    }

    #[test]
    fn units_normalize_to_bits() {
        let eight_gb = gigabytes(8);
        let megabytes = Memory {
            value: 8 * 1024,
            unit: Unit::Megabyte as i32,
        };
        assert_eq!(memory_bits(&eight_gb), memory_bits(&megabytes));
        assert_eq!(
            memory_bits(&Memory {
                value: 1,
                unit: Unit::Byte as i32
            }),
            8
        );
        assert_eq!(
            memory_bits(&Memory {
                value: 5,
                unit: Unit::Unknown as i32
            }),
            0
        );
    }

    #[test]
    fn laptop_on_every_bound_matches() {
        assert!(is_qualified(&filter(), &laptop(2999.0, 4, 2.5, gigabytes(8))));
    }

    #[test]
    fn each_bound_excludes_on_its_own() {
        let filter = filter();
        assert!(!is_qualified(&filter, &laptop(3001.0, 4, 2.5, gigabytes(8))));
        assert!(!is_qualified(&filter, &laptop(2999.0, 2, 2.5, gigabytes(8))));
        assert!(!is_qualified(&filter, &laptop(2999.0, 4, 2.4, gigabytes(8))));
        assert!(!is_qualified(&filter, &laptop(2999.0, 4, 2.5, gigabytes(4))));
    }

    #[test]
    fn ram_in_smaller_unit_still_compares() {
        let ram = Memory {
            value: 16 * 1024,
            unit: Unit::Megabyte as i32,
        };
        assert!(is_qualified(&filter(), &laptop(1500.0, 8, 3.0, ram)));
    }
}
