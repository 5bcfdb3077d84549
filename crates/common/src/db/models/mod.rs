//! SeaORM entity models
//!
//! One module per service store: slots and sessions belong to the
//! slot/session manager, tariffs to the tariff engine, payments and
//! offline payments to settlement. Entities never cross stores.

mod offline_payment;
mod parking_session;
mod payment;
mod slot;
mod tariff;

pub use slot::{
    Entity as SlotEntity,
    Model as Slot,
    ActiveModel as SlotActiveModel,
    Column as SlotColumn,
    SlotStatus,
};

pub use parking_session::{
    Entity as SessionEntity,
    Model as ParkingSession,
    ActiveModel as SessionActiveModel,
    Column as SessionColumn,
};

pub use tariff::{
    Entity as TariffEntity,
    Model as Tariff,
    ActiveModel as TariffActiveModel,
    Column as TariffColumn,
};

pub use payment::{
    Entity as PaymentEntity,
    Model as Payment,
    ActiveModel as PaymentActiveModel,
    Column as PaymentColumn,
};

pub use offline_payment::{
    Entity as OfflinePaymentEntity,
    Model as OfflinePayment,
    ActiveModel as OfflinePaymentActiveModel,
    Column as OfflinePaymentColumn,
};
