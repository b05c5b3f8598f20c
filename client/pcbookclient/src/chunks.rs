use std::io::{self, Read};

/// Splits a reader into chunks of at most `size` bytes. Only the last chunk
/// may be shorter.
pub struct Chunks<R> {
    reader: R,
    size: usize,
    done: bool,
}

impl<R: Read> Chunks<R> {
    pub fn new(reader: R, size: usize) -> Chunks<R> {
        Chunks {
            reader,
            size: size.max(1),
            done: false,
        }
    }
}

impl<R: Read> Iterator for Chunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = Vec::with_capacity(self.size);
        match self.reader.by_ref().take(self.size as u64).read_to_end(&mut buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                if n < self.size {
                    self.done = true;
                }
                Some(Ok(buf))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn last_chunk_holds_remainder() {
        let data: Vec<u8> = (0..2500u32).map(|i| i as u8).collect();
        let chunks: Vec<Vec<u8>> = Chunks::new(&data[..], 1024).map(|c| c.unwrap()).collect();

        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![1024, 1024, 452]);
        assert_eq!(chunks.concat(), data);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let data = vec![1u8; 2048];
        assert_eq!(Chunks::new(&data[..], 1024).count(), 2);
        assert_eq!(Chunks::new(&[0u8; 0][..], 1024).count(), 0);
    }
}
