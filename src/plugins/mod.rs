pub mod audit;
pub mod decide;
pub mod riskflag;
pub mod status;
