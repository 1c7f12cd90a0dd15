use crate::domain::order::Order;
use crate::error::Result;
use std::io::Write;

/// Writes the final order report as CSV: one row per order with its owner,
/// total and current status.
pub struct OrderReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders(&mut self, orders: &[Order]) -> Result<()> {
        self.writer.write_record(["order", "user", "total", "status"])?;
        for order in orders {
            self.writer.write_record([
                order.id.to_string(),
                order.user_id.to_string(),
                order.total_amount.to_string(),
                order.status.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
