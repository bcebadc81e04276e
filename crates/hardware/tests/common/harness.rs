use dtemu_core::common::SimError;
use dtemu_core::config::Config;
use dtemu_core::core::Cpu;
use dtemu_core::isa::mips::cp0::reg as cp0;
use dtemu_core::{Arch, Liveness, Machine, Mips, Scheduler};

/// RAM given to test machines (1 MiB at physical zero).
pub const TEST_RAM: u64 = 1024 * 1024;

/// Configuration used by every test machine unless overridden.
pub fn test_config(cpus: usize) -> Config {
    let mut config = Config::default();
    config.general.cpus = cpus;
    config.memory.ram_size = TEST_RAM;
    config
}

pub struct TestContext<A: Arch> {
    pub machine: Machine<A>,
    pub sched: Scheduler,
}

impl<A: Arch> TestContext<A> {
    pub fn new(cpus: usize) -> Self {
        Self::with_config(&test_config(cpus))
    }

    pub fn with_config(config: &Config) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();

        let machine = Machine::new(config).expect("test config is valid");
        let sched = Scheduler::new(config);
        Self { machine, sched }
    }

    /// Convenience accessor for CPU 0.
    pub fn cpu(&self) -> &Cpu<A> {
        &self.machine.cpus[0]
    }

    /// Mutable convenience accessor for CPU 0.
    pub fn cpu_mut(&mut self) -> &mut Cpu<A> {
        &mut self.machine.cpus[0]
    }

    /// Writes `instructions` at the physical address backing `vaddr` and points CPU 0 there.
    pub fn load_program(mut self, vaddr: u64, instructions: &[u32]) -> Self {
        self.poke_words(vaddr, instructions);
        self.machine.cpus[0].set_pc(vaddr);
        self
    }

    /// Writes words at the physical address backing `vaddr` without moving any PC.
    pub fn poke_words(&mut self, vaddr: u64, words: &[u32]) {
        let base = A::image_paddr(vaddr);
        for (i, w) in words.iter().enumerate() {
            self.machine.bus.write_u32(base + (i as u64) * 4, *w);
        }
    }

    pub fn read_word(&mut self, paddr: u64) -> u32 {
        self.machine.bus.read_u32(paddr)
    }

    /// Set a general-purpose register value on CPU 0.
    pub fn set_reg(&mut self, reg: usize, val: u64) {
        self.cpu_mut().regs.write(reg, val);
    }

    /// Read a general-purpose register value of CPU 0.
    pub fn get_reg(&self, reg: usize) -> u64 {
        self.cpu().regs.read(reg)
    }

    /// Runs exactly one burst of at most `count` instructions on CPU 0.
    pub fn run(&mut self, count: u64) -> u64 {
        self.step_cpu(0, count).expect("cpu 0 exists")
    }

    /// Runs one burst on CPU `cpu` only.
    pub fn step_cpu(&mut self, cpu: usize, count: u64) -> Result<u64, SimError> {
        self.sched.single_step(&mut self.machine, cpu, count)
    }

    /// Runs one scheduling round across every CPU.
    pub fn round(&mut self) -> Liveness {
        self.sched.run_burst(&mut self.machine)
    }
}

impl TestContext<Mips> {
    /// A MIPS machine in kernel mode with bootstrap vectors off and interrupts masked.
    pub fn mips(cpus: usize) -> Self {
        Self::mips_with(&test_config(cpus))
    }

    pub fn mips_with(config: &Config) -> Self {
        let mut ctx = Self::with_config(config);
        for cpu in &mut ctx.machine.cpus {
            cpu.ctrl.write(cp0::STATUS as usize, 0);
        }
        ctx
    }

    pub fn cp0(&self, reg: u8) -> u32 {
        self.cpu().ctrl.read(reg as usize) as u32
    }

    pub fn set_cp0(&mut self, reg: u8, val: u32) {
        self.cpu_mut().ctrl.write(reg as usize, u64::from(val));
    }
}
