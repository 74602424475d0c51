use super::console::Console;
use super::device::DeviceState;
use super::file::FileState;
use super::random::Random;
use super::runtime::ForFrame;
use super::{Address, Var};
use crate::config::Config;
use serde::{Deserialize, Serialize};

/// ## Machine state at rest
///
/// Everything a suspended machine needs to carry on elsewhere. The
/// compiled program is not kept; the listing is compiled again and
/// produces the same addresses.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub config: Config,
    pub listing: Vec<String>,
    pub cont: Option<Address>,
    pub gosub: Vec<Address>,
    pub loops: Vec<ForFrame>,
    pub var: Var,
    pub console: Console,
    pub random: Random,
    pub devices: DeviceState,
    pub files: Vec<FileState>,
}
