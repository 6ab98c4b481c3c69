// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

use serde::Serialize;
use serde::Deserialize;
use num::{One, Zero, BigRational, BigInt};
use crate::ballot_pile::BallotPaperCount;
use std::fmt::{Display, Formatter};
use std::convert::TryFrom;
use std::str::FromStr;
use num::rational::{ParseRatioError, Ratio};

/// The fraction of a vote that each ballot paper in a parcel carries.
/// Always an exact rational in [0,1]; the count never sees a truncated value.
#[derive(Clone,Debug,Serialize,Deserialize,Ord, PartialOrd, Eq, PartialEq,Hash)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct TransferValue(pub(crate) BigRational);

impl TransferValue {
    pub fn one() -> Self { TransferValue(BigRational::one()) }
    pub fn new(numerator:BigInt,denominator:BigInt) -> Self {
        TransferValue(BigRational::new(numerator,denominator))
    }

    /// The statutory formula: a surplus divided by a number of ballot papers.
    pub fn from_surplus(surplus:&BigRational,denominator:BallotPaperCount) -> Self {
        TransferValue(surplus/BigRational::from_integer(BigInt::from(denominator.0)))
    }

    /// A redistributed parcel never leaves at a higher value than it arrived with.
    pub fn capped_at(&self,incoming:&TransferValue) -> TransferValue {
        if self.0>incoming.0 { incoming.clone() } else { self.clone() }
    }

    /// Exact worth of a pile of papers at this value.
    pub fn mul(&self,papers:BallotPaperCount) -> BigRational {
        BigRational::new(self.0.numer().clone()*BigInt::from(papers.0),self.0.denom().clone())
    }

    pub fn is_zero(&self) -> bool { self.0.is_zero() }

    /// Decimal rendering truncated (never rounded) to the given number of places.
    /// For display only; the count itself works on the exact fraction.
    pub fn decimal_truncated(&self,digits:usize) -> String { decimal_truncated(&self.0,digits) }
}

impl Display for TransferValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f,"{}",self.0)
    }
}

impl From<TransferValue> for String {
    fn from(t: TransferValue) -> Self { t.0.to_string() }
}

impl FromStr for TransferValue {
    type Err = ParseRatioError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(TransferValue(Ratio::from_str(s)?)) }
}

impl TryFrom<String> for TransferValue {
    type Error = ParseRatioError;
    fn try_from(s: String) -> Result<Self, Self::Error> { Ok(TransferValue(Ratio::from_str(&s)?)) }
}

/// An exact rational tally that serialises as the string "p/q" so that
/// transcript files never lose precision to a binary representation.
#[derive(Clone,Debug,Serialize,Deserialize,Ord, PartialOrd, Eq, PartialEq,Hash)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct StringSerializedRational(pub BigRational);

impl StringSerializedRational {
    pub fn zero() -> Self { StringSerializedRational(BigRational::zero()) }
    pub fn decimal_truncated(&self,digits:usize) -> String { decimal_truncated(&self.0,digits) }
}

impl From<BigRational> for StringSerializedRational {
    fn from(r: BigRational) -> Self { StringSerializedRational(r) }
}

impl From<StringSerializedRational> for String {
    fn from(r: StringSerializedRational) -> Self { r.0.to_string() }
}

impl TryFrom<String> for StringSerializedRational {
    type Error = ParseRatioError;
    fn try_from(s: String) -> Result<Self, Self::Error> { Ok(StringSerializedRational(Ratio::from_str(&s)?)) }
}

impl Display for StringSerializedRational {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f,"{}",self.0)
    }
}

/// Write a non-negative rational as a decimal truncated to `digits` places.
fn decimal_truncated(r:&BigRational,digits:usize) -> String {
    let int_part = r.numer()/r.denom();
    if digits==0 { return int_part.to_string(); }
    let mut scale = BigInt::one();
    for _ in 0..digits { scale *= BigInt::from(10); }
    let remainder = r.numer()-&int_part*r.denom();
    let frac_digits = (remainder*scale)/r.denom();
    let mut frac_str = frac_digits.to_string();
    while frac_str.len()<digits { frac_str.insert(0,'0'); }
    format!("{}.{}",int_part,frac_str)
}
