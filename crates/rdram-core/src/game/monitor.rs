use std::sync::{Arc, Mutex, OnceLock};

use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::discovery::{DiscoveryConfig, DiscoveryMethod, RamDiscovery};
use crate::error::{Error, Result};
use crate::game::{FieldValue, GameStateSnapshot, Position, TitleAdapter, adapter_for};
use crate::memory::{ProcessMemory, RamRegion, ReadMemory};
use crate::profile::{AddressTable, Field, FieldWidth, ProfileRegistry};

/// Typed view of the game running in the attached emulator.
///
/// Every read goes to the live process. The located RAM is remembered for
/// the current attachment only.
pub struct GameMonitor {
    memory: Arc<ProcessMemory>,
    registry: ProfileRegistry,
    discovery: DiscoveryConfig,
    title: Option<String>,
    table: AddressTable,
    adapter: OnceLock<Option<Box<dyn TitleAdapter>>>,
    /// RAM and the attachment it was located in
    ram: Mutex<Option<(u64, RamRegion)>>,
}

impl GameMonitor {
    pub fn new(
        memory: Arc<ProcessMemory>,
        registry: ProfileRegistry,
        discovery: DiscoveryConfig,
    ) -> Self {
        Self {
            memory,
            registry,
            discovery,
            title: None,
            table: AddressTable::new(),
            adapter: OnceLock::new(),
            ram: Mutex::new(None),
        }
    }

    pub fn memory(&self) -> &Arc<ProcessMemory> {
        &self.memory
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn table(&self) -> &AddressTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut AddressTable {
        &mut self.table
    }

    /// Load the address table for `title` and drop the current adapter.
    pub fn configure_for_title(&mut self, title: &str) {
        self.table = self.registry.table_for(title);
        self.title = Some(title.to_string());
        self.adapter = OnceLock::new();
        info!(
            "Configured for '{}' ({})",
            title,
            self.table
                .title()
                .map(|id| id.as_str())
                .unwrap_or("no profile")
        );
    }

    pub fn connect(&mut self, pid: u32) -> Result<()> {
        self.clear_ram();
        self.memory.connect(pid)?;
        self.adapter();
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.memory.disconnect();
        self.clear_ram();
        self.adapter = OnceLock::new();
    }

    pub fn is_connected(&self) -> bool {
        self.memory.is_connected()
    }

    pub fn status(&self) -> String {
        self.memory.status()
    }

    fn adapter(&self) -> Option<&dyn TitleAdapter> {
        self.adapter
            .get_or_init(|| self.table.title().and_then(adapter_for))
            .as_deref()
    }

    fn clear_ram(&self) {
        *self.ram.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Run discovery now and remember the result for this attachment.
    pub fn locate_ram(&self, method: DiscoveryMethod) -> Result<RamRegion> {
        let attachment = self.memory.attachment().ok_or(Error::NotConnected)?;
        let ram = RamDiscovery::new(self.memory.as_ref(), self.discovery.clone()).locate(method)?;
        *self.ram.lock().unwrap_or_else(|e| e.into_inner()) = Some((attachment, ram));
        Ok(ram)
    }

    /// The remembered RAM, locating it first if this attachment has none.
    pub fn ram(&self) -> Result<RamRegion> {
        let attachment = self.memory.attachment().ok_or(Error::NotConnected)?;
        let cached = *self.ram.lock().unwrap_or_else(|e| e.into_inner());
        match cached {
            Some((located_in, ram)) if located_in == attachment => Ok(ram),
            _ => self.locate_ram(self.discovery.method),
        }
    }

    /// Read every configured field.
    ///
    /// Unset fields are skipped and unreadable ones are recorded; only a lost
    /// attachment or missing RAM fails the whole snapshot.
    pub fn snapshot(&self) -> Result<GameStateSnapshot> {
        let ram = self.ram()?;
        let mut snapshot = GameStateSnapshot::default();

        for field in Field::iter() {
            let address = self.table.get(field);
            if address == 0 {
                continue;
            }
            match self.read_at(ram, field, address) {
                Ok(value) => snapshot.apply(field, value),
                Err(e) if e.is_field_level() => {
                    debug!("{} at 0x{:08X} unreadable: {}", field, address, e);
                    snapshot.unreadable.push(field);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(snapshot)
    }

    /// Read one field live. `Ok(None)` when the field has no address.
    pub fn read_field(&self, field: Field) -> Result<Option<FieldValue>> {
        let address = self.table.get(field);
        if address == 0 {
            return Ok(None);
        }
        let ram = self.ram()?;
        self.read_at(ram, field, address).map(Some)
    }

    fn read_at(&self, ram: RamRegion, field: Field, address: u32) -> Result<FieldValue> {
        let width = field.width();
        let host = ram.host_address(address, width.size())?;
        let raw = match width {
            FieldWidth::U8 => FieldValue::U8(self.memory.read_u8(host)?),
            FieldWidth::U16 => FieldValue::U16(self.memory.read_u16(host)?),
            FieldWidth::U32 => FieldValue::U32(self.memory.read_u32(host)?),
            FieldWidth::F32 => FieldValue::F32(self.memory.read_f32(host)?),
        };
        Ok(match self.adapter() {
            Some(adapter) => adapter.decode(field, raw),
            None => raw,
        })
    }

    pub fn stars(&self) -> Result<Option<u16>> {
        Ok(match self.read_field(Field::Stars)? {
            Some(FieldValue::U16(v)) => Some(v),
            _ => None,
        })
    }

    pub fn coins(&self) -> Result<Option<u16>> {
        Ok(match self.read_field(Field::Coins)? {
            Some(FieldValue::U16(v)) => Some(v),
            _ => None,
        })
    }

    pub fn lives(&self) -> Result<Option<u8>> {
        Ok(match self.read_field(Field::Lives)? {
            Some(FieldValue::U8(v)) => Some(v),
            _ => None,
        })
    }

    pub fn health(&self) -> Result<Option<u16>> {
        Ok(match self.read_field(Field::Health)? {
            Some(FieldValue::U16(v)) => Some(v),
            _ => None,
        })
    }

    pub fn score(&self) -> Result<Option<u32>> {
        Ok(match self.read_field(Field::Score)? {
            Some(FieldValue::U32(v)) => Some(v),
            _ => None,
        })
    }

    pub fn position(&self) -> Result<Option<Position>> {
        let axis = |field| -> Result<Option<f32>> {
            Ok(match self.read_field(field)? {
                Some(FieldValue::F32(v)) => Some(v),
                _ => None,
            })
        };
        let (x, y, z) = (
            axis(Field::PlayerX)?,
            axis(Field::PlayerY)?,
            axis(Field::PlayerZ)?,
        );
        Ok(x.zip(y).zip(z).map(|((x, y), z)| Position { x, y, z }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::WriteMemory;
    use crate::memory::layout::rdram;
    use crate::memory::mock::MockMemoryBuilder;

    const RAM_BASE: u64 = 0x2000_0000;

    fn host(console: u32) -> u64 {
        RAM_BASE + (console & rdram::PHYSICAL_MASK) as u64
    }

    /// A 4 MiB console RAM holding a Super Mario 64 session.
    fn sm64_session() -> GameMonitor {
        let memory = Arc::new(ProcessMemory::new());
        memory.connect_backend(Box::new(
            MockMemoryBuilder::new()
                .writable(0x1000_0000, 0x10000)
                .writable(RAM_BASE, rdram::BASE_SIZE)
                .fill(RAM_BASE, &rdram::BOOT_SIGNATURE)
                .build(),
        ));
        memory.write_f32(host(0x8033_B1AC), 120.5).unwrap();
        memory.write_f32(host(0x8033_B1B0), -64.0).unwrap();
        memory.write_f32(host(0x8033_B1B4), 3000.0).unwrap();
        memory.write_u16(host(0x8033_B218), 17).unwrap();
        memory.write_u16(host(0x8033_B21A), 42).unwrap();
        memory.write_u8(host(0x8033_B21D), 4).unwrap();
        memory.write_u16(host(0x8033_B21E), 0x0880).unwrap();

        let mut monitor =
            GameMonitor::new(memory, ProfileRegistry::builtin(), DiscoveryConfig::default());
        monitor.configure_for_title("Super Mario 64");
        monitor
    }

    #[test]
    fn test_sm64_snapshot() {
        let monitor = sm64_session();
        let snapshot = monitor.snapshot().unwrap();

        assert_eq!(snapshot.stars, Some(42));
        assert_eq!(snapshot.coins, Some(17));
        assert_eq!(snapshot.lives, Some(4));
        assert_eq!(snapshot.health, Some(8));
        assert_eq!(
            snapshot.position(),
            Some(Position {
                x: 120.5,
                y: -64.0,
                z: 3000.0
            })
        );
        assert_eq!(snapshot.score, None);
        assert_eq!(snapshot.game_state, None);
        assert!(snapshot.unreadable.is_empty());
        assert!(!snapshot.is_game_over());
        assert!(!snapshot.is_paused());
        assert_eq!(monitor.ram().unwrap(), RamRegion::new(RAM_BASE, rdram::BASE_SIZE));
    }

    #[test]
    fn test_override_redirects_read() {
        let mut monitor = sm64_session();
        monitor
            .memory()
            .write_u16(host(0x8030_0000), 99)
            .unwrap();

        monitor.table_mut().set_address(Field::Stars, 0x8030_0000);
        assert_eq!(monitor.stars().unwrap(), Some(99));

        monitor.table_mut().clear_override(Field::Stars);
        assert_eq!(monitor.stars().unwrap(), Some(42));
    }

    #[test]
    fn test_reads_are_live() {
        let monitor = sm64_session();
        assert_eq!(monitor.coins().unwrap(), Some(17));
        monitor.memory().write_u16(host(0x8033_B218), 18).unwrap();
        assert_eq!(monitor.snapshot().unwrap().coins, Some(18));
    }

    #[test]
    fn test_zero_lives_is_game_over() {
        let monitor = sm64_session();
        monitor.memory().write_u8(host(0x8033_B21D), 0).unwrap();

        let snapshot = monitor.snapshot().unwrap();
        assert!(snapshot.is_game_over());
        assert!(snapshot.is_out_of_lives());
        assert!(!snapshot.is_out_of_health());
    }

    #[test]
    fn test_paused_flag() {
        let mut monitor = sm64_session();
        monitor.table_mut().set_address(Field::GameState, 0x8033_0000);
        assert!(!monitor.snapshot().unwrap().is_paused());

        monitor.memory().write_u8(host(0x8033_0000), 2).unwrap();
        assert!(monitor.snapshot().unwrap().is_paused());
    }

    #[test]
    fn test_out_of_range_field_is_recorded_not_fatal() {
        let mut monitor = sm64_session();
        // Beyond a 4 MiB RAM
        monitor.table_mut().set_address(Field::Score, 0x8060_0000);

        let snapshot = monitor.snapshot().unwrap();
        assert_eq!(snapshot.score, None);
        assert_eq!(snapshot.unreadable, vec![Field::Score]);
        assert_eq!(snapshot.stars, Some(42));
    }

    #[test]
    fn test_unknown_title_reads_nothing() {
        let mut monitor = sm64_session();
        monitor.configure_for_title("Banjo-Kazooie");

        let snapshot = monitor.snapshot().unwrap();
        assert_eq!(snapshot, GameStateSnapshot::default());
        assert_eq!(monitor.stars().unwrap(), None);
    }

    #[test]
    fn test_disconnect_invalidates_everything() {
        let mut monitor = sm64_session();
        monitor.snapshot().unwrap();

        monitor.disconnect();
        assert!(!monitor.is_connected());
        assert!(matches!(monitor.snapshot(), Err(Error::NotConnected)));
        assert!(matches!(monitor.ram(), Err(Error::NotConnected)));
    }

    #[test]
    fn test_shared_disconnect_is_seen_by_monitor() {
        let monitor = sm64_session();
        monitor.snapshot().unwrap();

        monitor.memory().disconnect();
        assert!(matches!(monitor.stars(), Err(Error::NotConnected)));
    }

    #[test]
    fn test_reattach_to_same_pid_locates_ram_again() {
        let monitor = sm64_session();
        assert_eq!(monitor.ram().unwrap().base, RAM_BASE);

        const MOVED: u64 = 0x5000_0000;
        monitor.memory().disconnect();
        monitor.memory().connect_backend(Box::new(
            MockMemoryBuilder::new()
                .writable(MOVED, rdram::BASE_SIZE)
                .fill(MOVED, &rdram::BOOT_SIGNATURE)
                .build(),
        ));
        monitor
            .memory()
            .write_u16(MOVED + 0x0033_B21A, 7)
            .unwrap();

        assert_eq!(monitor.ram().unwrap().base, MOVED);
        let snapshot = monitor.snapshot().unwrap();
        assert_eq!(snapshot.stars, Some(7));
        assert!(snapshot.unreadable.is_empty());
    }
}
