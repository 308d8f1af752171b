//! Append-only list of deferred mutations, flushed at end-of-frame.
//!
//! Two fixed-capacity arenas: `cmds` (one entry per queued mutation) and
//! `stage` (the byte arena payloads are copied into at push time). A
//! command's `stage_offset`/`payload_len` slice that arena; `World` is the
//! single reader, once per frame, via `flush_commands`.
//!
//! Flushing needs to tell a stale handle apart from a live one, which a bare
//! entity index can't do — `Command` carries the full `EntityHandle` (index
//! *and* generation) instead, the same way `Job::parent` carries a full
//! handle rather than a bare index.

use crate::component::ComponentTypeId;
use crate::entity::EntityHandle;
use anvil_core::error::{Error, Result};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CommandKind {
    Add,
    Set,
    Remove,
    Destroy,
}

#[derive(Copy, Clone, Debug)]
pub struct Command {
    pub kind: CommandKind,
    pub type_id: ComponentTypeId,
    pub entity: EntityHandle,
    stage_offset: u32,
    payload_len: u32,
}

pub struct CommandBuffer<const MAX_CMDS: usize, const STAGE_BYTES: usize> {
    cmds: Vec<Command>,
    stage: Box<[u8]>,
    stage_len: usize,
}

impl<const MAX_CMDS: usize, const STAGE_BYTES: usize> CommandBuffer<MAX_CMDS, STAGE_BYTES> {
    pub fn new() -> Self {
        Self {
            cmds: Vec::with_capacity(MAX_CMDS),
            stage: vec![0u8; STAGE_BYTES].into_boxed_slice(),
            stage_len: 0,
        }
    }

    /// Appends a command, copying `payload` (if any) into the byte arena.
    /// `ErrOutOfSpace` if either the command list or the byte arena is full.
    pub fn push(
        &mut self,
        kind: CommandKind,
        type_id: ComponentTypeId,
        entity: EntityHandle,
        payload: Option<&[u8]>,
    ) -> Result<()> {
        if self.cmds.len() >= MAX_CMDS {
            return Err(Error::OutOfSpace);
        }

        let (stage_offset, payload_len) = match payload {
            Some(bytes) => {
                if self.stage_len + bytes.len() > STAGE_BYTES {
                    return Err(Error::OutOfSpace);
                }
                let offset = self.stage_len;
                self.stage[offset..offset + bytes.len()].copy_from_slice(bytes);
                self.stage_len += bytes.len();
                (offset as u32, bytes.len() as u32)
            }
            None => (0, 0),
        };

        self.cmds.push(Command {
            kind,
            type_id,
            entity,
            stage_offset,
            payload_len,
        });
        Ok(())
    }

    /// Commands in push order, paired with their staged payload bytes
    /// (empty slice if the command carried none).
    pub fn iter(&self) -> impl Iterator<Item = (&Command, &[u8])> {
        self.cmds.iter().map(move |cmd| {
            let start = cmd.stage_offset as usize;
            let end = start + cmd.payload_len as usize;
            (cmd, &self.stage[start..end])
        })
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Single-writer, per-frame: `World::flush_commands` is the only
    /// consumer, and resets both cursors after draining.
    pub fn clear(&mut self) {
        self.cmds.clear();
        self.stage_len = 0;
    }
}

impl<const MAX_CMDS: usize, const STAGE_BYTES: usize> Default
    for CommandBuffer<MAX_CMDS, STAGE_BYTES>
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(index: u32) -> EntityHandle {
        EntityHandle::from_packed(index)
    }

    #[test]
    fn push_preserves_order_and_payload_bytes() {
        let mut buf: CommandBuffer<8, 64> = CommandBuffer::new();
        buf.push(CommandKind::Add, 1, handle(0), Some(&[1, 2, 3, 4]))
            .unwrap();
        buf.push(CommandKind::Set, 1, handle(0), Some(&[5, 6, 7, 8]))
            .unwrap();
        buf.push(CommandKind::Destroy, 0, handle(1), None).unwrap();

        let entries: Vec<_> = buf.iter().collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0.kind, CommandKind::Add);
        assert_eq!(entries[0].1, &[1, 2, 3, 4]);
        assert_eq!(entries[1].0.kind, CommandKind::Set);
        assert_eq!(entries[1].1, &[5, 6, 7, 8]);
        assert_eq!(entries[2].0.kind, CommandKind::Destroy);
        assert!(entries[2].1.is_empty());
    }

    #[test]
    fn clear_resets_both_cursors() {
        let mut buf: CommandBuffer<4, 16> = CommandBuffer::new();
        buf.push(CommandKind::Add, 1, handle(0), Some(&[9, 9, 9]))
            .unwrap();
        buf.clear();
        assert!(buf.is_empty());
        buf.push(CommandKind::Add, 1, handle(0), Some(&[1, 2, 3, 4, 5]))
            .unwrap();
        let entries: Vec<_> = buf.iter().collect();
        assert_eq!(entries[0].1, &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn command_list_overflow() {
        let mut buf: CommandBuffer<1, 16> = CommandBuffer::new();
        buf.push(CommandKind::Destroy, 0, handle(0), None).unwrap();
        assert_eq!(
            buf.push(CommandKind::Destroy, 0, handle(1), None).unwrap_err(),
            Error::OutOfSpace
        );
    }

    #[test]
    fn stage_arena_overflow() {
        let mut buf: CommandBuffer<8, 4> = CommandBuffer::new();
        buf.push(CommandKind::Add, 0, handle(0), Some(&[1, 2, 3, 4]))
            .unwrap();
        assert_eq!(
            buf.push(CommandKind::Add, 0, handle(1), Some(&[5]))
                .unwrap_err(),
            Error::OutOfSpace
        );
    }
}
