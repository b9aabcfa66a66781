// Имитация S-A-A-2 в памяти: регистровое пространство, FIFO и поток записей,
// так что DeviceLink и CaptureEngine видят почти то же, что с реального
// прибора. ИУ: последовательная RLC-цепь между портами.
// Состояние лежит в Arc<Mutex<..>>: тест держит SimHandle и после сессии
// проверяет, какие кадры были отправлены и закрыт ли канал.

use std::{
    collections::VecDeque,
    f64::consts::PI,
    io,
    sync::{Arc, Mutex, MutexGuard},
};

use log::debug;
use num_complex::{Complex, Complex64};
use vna_core::{
    RawRecordExt, INDICATE_REPLY, OP_INDICATE, OP_READFIFO, OP_WRITE, REG_FIFO, REG_SWEEP_POINTS,
    REG_SWEEP_START, REG_SWEEP_STEP,
};
use vna_types::RawRecord;

use crate::Transport;

/// Волновое сопротивление тракта, Ом
const Z0: f64 = 50.0;

/// Амплитуда опорного канала в отсчётах АЦП
const REFERENCE_AMPLITUDE: f64 = 1_000_000.0;

/// Последовательная RLC-цепь, включённая между портом 1 и портом 2.
#[derive(Debug, Clone, Copy)]
pub struct SeriesRlc {
    pub r_ohm: f64,
    pub l_h: f64,
    pub c_f: f64,
}

impl SeriesRlc {
    pub fn impedance(
        &self,
        freq_hz: f64,
    ) -> Complex64 {
        let w = 2.0 * PI * freq_hz.max(1.0);
        Complex64::new(self.r_ohm, w * self.l_h - 1.0 / (w * self.c_f))
    }

    /// (S11, S21) для последовательного элемента: Z/(Z+2Z0), 2Z0/(Z+2Z0).
    pub fn s_params(
        &self,
        freq_hz: f64,
    ) -> (Complex64, Complex64) {
        let z = self.impedance(freq_hz);
        let denom = z + 2.0 * Z0;
        (z / denom, Complex64::new(2.0 * Z0, 0.0) / denom)
    }
}

impl Default for SeriesRlc {
    fn default() -> Self {
        // резонанс ≈ 15.9 МГц
        Self {
            r_ohm: 5.0,
            l_h: 1e-6,
            c_f: 100e-12,
        }
    }
}

/// Поведение имитатора.
#[derive(Debug, Clone)]
pub struct SimBehavior {
    /// Ответ на INDICATE
    pub identity: Vec<u8>,
    /// Сколько записей появляется в FIFO между соседними READFIFO
    pub records_per_poll: usize,
    /// Первые N чтений FIFO возвращают пустоту
    pub starved_polls: usize,
    /// Всего записей за развёртку (None = бесконечный поток)
    pub record_budget: Option<usize>,
    /// Нулевой опорный канал во всех записях
    pub zero_reference: bool,
    pub dut: SeriesRlc,
}

impl Default for SimBehavior {
    fn default() -> Self {
        Self {
            identity: INDICATE_REPLY.to_vec(),
            records_per_poll: 8,
            starved_polls: 0,
            record_budget: None,
            zero_reference: false,
            dut: SeriesRlc::default(),
        }
    }
}

#[derive(Debug)]
struct SimState {
    behavior: SimBehavior,
    registers: [u8; 256],
    fifo: VecDeque<u8>,
    reply: Vec<u8>,
    frames: Vec<Vec<u8>>,
    next_index: u16,
    produced: usize,
    polls: usize,
    closed: bool,
}

/// Имитатор S-A-A-2, реализующий [`Transport`].
pub struct SimulatedVna {
    state: Arc<Mutex<SimState>>,
}

/// Наблюдатель за состоянием имитатора.
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    // отравление здесь возможно только после паники в тесте
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl SimulatedVna {
    pub fn new() -> Self {
        Self::with_behavior(SimBehavior::default())
    }

    pub fn with_behavior(behavior: SimBehavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                behavior,
                registers: [0u8; 256],
                fifo: VecDeque::new(),
                reply: Vec::new(),
                frames: Vec::new(),
                next_index: 0,
                produced: 0,
                polls: 0,
                closed: false,
            })),
        }
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: self.state.clone(),
        }
    }
}

impl Default for SimulatedVna {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHandle {
    /// Все принятые кадры в порядке поступления.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        lock(&self.state).frames.clone()
    }

    /// Кол-во принятых кадров WRITE.
    pub fn write_count(&self) -> usize {
        lock(&self.state)
            .frames
            .iter()
            .filter(|f| f.first() == Some(&OP_WRITE))
            .count()
    }

    pub fn register(
        &self,
        address: u8,
    ) -> u8 {
        lock(&self.state).registers[address as usize]
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Записей, выданных в FIFO с последней очистки.
    pub fn produced(&self) -> usize {
        lock(&self.state).produced
    }
}

impl SimState {
    fn reg_u64(
        &self,
        base: u8,
    ) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.registers[base as usize..base as usize + 8]);
        u64::from_le_bytes(b)
    }

    fn reg_u16(
        &self,
        base: u8,
    ) -> u16 {
        let b = base as usize;
        u16::from_le_bytes([self.registers[b], self.registers[b + 1]])
    }

    fn clear_fifo(&mut self) {
        self.fifo.clear();
        self.next_index = 0;
        self.produced = 0;
        self.polls = 0;
    }

    fn next_record(&mut self) -> RawRecord {
        let points = self.reg_u16(REG_SWEEP_POINTS).max(1);
        let idx = self.next_index;
        self.next_index = (idx + 1) % points;

        let freq = self.reg_u64(REG_SWEEP_START) as f64
            + idx as f64 * self.reg_u64(REG_SWEEP_STEP) as f64;

        if self.behavior.zero_reference {
            return RawRecord::new(
                Complex::new(0, 0),
                Complex::new(1_234, -5_678),
                Complex::new(42, 42),
                idx,
            );
        }

        // Опорный канал вращается, чтобы деление было нетривиальным
        let reference = Complex64::from_polar(REFERENCE_AMPLITUDE, 0.1 * idx as f64);
        let (s11, s21) = self.behavior.dut.s_params(freq);

        RawRecord::new(
            quantize(reference),
            quantize(s11 * reference),
            quantize(s21 * reference),
            idx,
        )
    }

    fn produce(&mut self) {
        for _ in 0..self.behavior.records_per_poll {
            if let Some(budget) = self.behavior.record_budget {
                if self.produced >= budget {
                    break;
                }
            }
            let rec = self.next_record();
            self.fifo.extend(rec.serialize());
            self.produced += 1;
        }
    }

    fn execute(
        &mut self,
        frame: &[u8],
    ) {
        self.frames.push(frame.to_vec());

        match frame[0] {
            OP_INDICATE => {
                let id = self.behavior.identity.clone();
                self.reply.extend_from_slice(&id);
            }
            OP_WRITE => {
                let (addr, value) = (frame[1], frame[2]);
                self.registers[addr as usize] = value;
                if addr == REG_FIFO {
                    self.clear_fifo();
                }
            }
            OP_READFIFO => {
                let len = u16::from_le_bytes([frame[2], frame[3]]) as usize;
                self.polls += 1;

                if self.polls <= self.behavior.starved_polls {
                    return;
                }

                self.produce();
                let n = len.min(self.fifo.len());
                self.reply.extend(self.fifo.drain(..n));
            }
            _ => {}
        }
    }
}

fn quantize(c: Complex64) -> Complex<i32> {
    Complex::new(c.re.round() as i32, c.im.round() as i32)
}

fn frame_len(opcode: u8) -> Option<usize> {
    match opcode {
        OP_INDICATE => Some(1),
        OP_WRITE => Some(3),
        OP_READFIFO => Some(4),
        _ => None,
    }
}

impl Transport for SimulatedVna {
    fn port_name(&self) -> String {
        "sim://s-a-a-2".to_string()
    }

    fn baud_rate(&self) -> u32 {
        115_200
    }

    fn write_all(
        &mut self,
        bytes: &[u8],
    ) -> io::Result<()> {
        let mut st = lock(&self.state);

        if st.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "simulator closed"));
        }

        let mut off = 0;
        while off < bytes.len() {
            let Some(len) = frame_len(bytes[off]) else {
                debug!("sim: ignoring unknown opcode 0x{:02x}", bytes[off]);
                off += 1;
                continue;
            };

            if off + len > bytes.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("truncated frame for opcode 0x{:02x}", bytes[off]),
                ));
            }

            st.execute(&bytes[off..off + len]);
            off += len;
        }

        Ok(())
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let mut st = lock(&self.state);

        if st.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "simulator closed"));
        }

        Ok(std::mem::take(&mut st.reply))
    }

    fn clear_input(&mut self) -> io::Result<()> {
        lock(&self.state).reply.clear();
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        lock(&self.state).closed = true;
        Ok(())
    }
}
