//! Byte addressed memory of an evaluated program.
//!
//! Every allocation (heap blocks, stack slots and static strings alike) gets
//! its own buffer. An address packs the allocation number into the high 32
//! bits and the byte offset into the low 32 bits, so the null pointer never
//! names a live allocation.

use log::trace;

use super::EvaluationError;

#[derive(Debug, Default)]
pub struct Memory {
    allocations: Vec<Option<Vec<u8>>>,
}

const OFFSET_BITS: u32 = 32;
const OFFSET_MASK: u64 = (1 << OFFSET_BITS) - 1;

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `size` zeroed bytes
    pub fn allocate(&mut self, size: usize) -> u64 {
        let index = self.allocations.len() as u64;
        self.allocations.push(Some(vec![0; size]));

        trace!("allocated {size} bytes at {:#x}", (index + 1) << OFFSET_BITS);
        (index + 1) << OFFSET_BITS
    }

    pub fn allocate_bytes(&mut self, bytes: &[u8]) -> u64 {
        let address = self.allocate(0);
        if let Some(Some(buffer)) = self.allocations.last_mut() {
            buffer.extend_from_slice(bytes);
        }
        address
    }

    /// Resizes the allocation `address` points at. Allocations never move,
    /// so the address stays valid.
    pub fn reallocate(&mut self, address: u64, size: usize) -> Result<u64, EvaluationError> {
        if address == 0 {
            return Ok(self.allocate(size));
        }

        let (buffer, _) = self.allocation_mut(address)?;
        buffer.resize(size, 0);
        Ok(address)
    }

    pub fn free(&mut self, address: u64) -> Result<(), EvaluationError> {
        if address == 0 {
            return Ok(());
        }

        let index = allocation_index(address).ok_or(EvaluationError::InvalidMemoryAccess(address))?;
        match self.allocations.get_mut(index) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(EvaluationError::InvalidMemoryAccess(address)),
        }
    }

    pub fn read(&self, address: u64, length: usize) -> Result<&[u8], EvaluationError> {
        let index = allocation_index(address).ok_or(EvaluationError::InvalidMemoryAccess(address))?;
        let offset = (address & OFFSET_MASK) as usize;

        match self.allocations.get(index) {
            Some(Some(buffer)) if offset + length <= buffer.len() => {
                Ok(&buffer[offset..offset + length])
            }
            _ => Err(EvaluationError::InvalidMemoryAccess(address)),
        }
    }

    pub fn write(&mut self, address: u64, bytes: &[u8]) -> Result<(), EvaluationError> {
        let (buffer, offset) = self.allocation_mut(address)?;

        match buffer.get_mut(offset..offset + bytes.len()) {
            Some(destination) => {
                destination.copy_from_slice(bytes);
                Ok(())
            }
            None => Err(EvaluationError::InvalidMemoryAccess(address)),
        }
    }

    /// Reads bytes up to (not including) the first NUL
    pub fn read_c_string(&self, address: u64) -> Result<Vec<u8>, EvaluationError> {
        let index = allocation_index(address).ok_or(EvaluationError::InvalidMemoryAccess(address))?;
        let offset = (address & OFFSET_MASK) as usize;

        match self.allocations.get(index) {
            Some(Some(buffer)) if offset <= buffer.len() => Ok(buffer[offset..]
                .iter()
                .take_while(|b| **b != 0)
                .copied()
                .collect()),
            _ => Err(EvaluationError::InvalidMemoryAccess(address)),
        }
    }

    fn allocation_mut(&mut self, address: u64) -> Result<(&mut Vec<u8>, usize), EvaluationError> {
        let index = allocation_index(address).ok_or(EvaluationError::InvalidMemoryAccess(address))?;
        let offset = (address & OFFSET_MASK) as usize;

        match self.allocations.get_mut(index) {
            Some(Some(buffer)) => Ok((buffer, offset)),
            _ => Err(EvaluationError::InvalidMemoryAccess(address)),
        }
    }
}

fn allocation_index(address: u64) -> Option<usize> {
    ((address >> OFFSET_BITS) as usize).checked_sub(1)
}

/// `address` moved by a signed byte offset
pub fn offset_address(address: u64, offset: i64) -> u64 {
    address.wrapping_add(offset as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reallocation_keeps_contents_and_address() {
        let mut memory = Memory::new();
        let address = memory.allocate(8);
        memory.write(address, &7i64.to_le_bytes()).unwrap();

        let moved = memory.reallocate(address, 800).unwrap();

        assert_eq!(moved, address);
        assert_eq!(memory.read(address, 8).unwrap(), &7i64.to_le_bytes());
        assert!(memory.read(offset_address(address, 792), 8).is_ok());
    }

    #[test]
    fn accesses_outside_an_allocation_fault() {
        let mut memory = Memory::new();
        let address = memory.allocate(4);

        assert_eq!(
            memory.read(address, 8),
            Err(EvaluationError::InvalidMemoryAccess(address))
        );
        assert!(memory.read(0, 1).is_err());

        memory.free(address).unwrap();
        assert!(memory.read(address, 1).is_err());
    }

    #[test]
    fn c_strings_stop_at_nul() {
        let mut memory = Memory::new();
        let address = memory.allocate_bytes(b"%g\0junk");

        assert_eq!(memory.read_c_string(address).unwrap(), b"%g");
    }
}
