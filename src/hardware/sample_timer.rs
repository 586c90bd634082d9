use super::{hal::pac, now_us};
use crate::transmit::next_deadline;

/// Audio sample tick on timer alarm 1 (`TIMER_IRQ_1`).
///
/// Alarm 0 belongs to the monotonic. Ticks are scheduled on absolute
/// deadlines so interrupt latency does not accumulate.
pub struct SampleTimer {
    deadline: u32,
}

impl SampleTimer {
    const ALARM: u32 = 1;

    fn regs() -> &'static pac::timer::RegisterBlock {
        // Note(unsafe): Only alarm 1 registers and bits are touched.
        unsafe { &*pac::TIMER::ptr() }
    }

    /// Arm the first tick.
    ///
    /// The timer must be out of reset (started by the monotonic).
    pub fn start(delay_us: u32) -> Self {
        let mut timer = Self { deadline: now_us() };
        let regs = Self::regs();
        critical_section::with(|_| {
            regs.inte()
                .modify(|r, w| unsafe { w.bits(r.bits() | 1 << Self::ALARM) });
        });
        timer.schedule(delay_us);
        timer
    }

    /// Acknowledge the interrupt.
    pub fn clear(&mut self) {
        Self::regs()
            .intr()
            .write(|w| unsafe { w.bits(1 << Self::ALARM) });
    }

    /// Arm the next tick `delay_us` after the previous deadline.
    ///
    /// # Returns
    /// False if the deadline was missed or too close to arm. The tick is
    /// then rescheduled from now, see [next_deadline].
    pub fn schedule(&mut self, delay_us: u32) -> bool {
        let (deadline, on_time) = next_deadline(self.deadline, delay_us, now_us());
        self.deadline = deadline;
        // Writing the alarm arms it.
        Self::regs()
            .alarm1()
            .write(|w| unsafe { w.bits(self.deadline) });
        on_time
    }
}
