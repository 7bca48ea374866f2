// FullyConnected — affine layer as an operator + symbol pair
//
//   output = data · weightᵀ + bias
//
// SLOTS:
//
//   inputs   0 data    [batch, 1, 1, features]   (viewed flat as [batch, features])
//            1 weight  [num_hidden, features]
//            2 bias    [num_hidden]              (absent when no_bias)
//   outputs  0 output  [batch, 1, 1, num_hidden]
//
// BACKWARD (adjoints of matmul + row broadcast):
//
//   d(weight) = out_gradᵀ · data
//   d(bias)   = Σ_rows out_grad
//   d(data)   = out_grad · weight
//
// Backward reads out_grad, data and weight only; the forward output and the
// bias value are never needed. The data gradient may overwrite the data
// buffer in place: it is computed last, after the weight gradient has
// consumed `data`, and nothing else reads `data` during backward.

use std::marker::PhantomData;

use dense_core::backend::Assign;
use dense_core::{Backend, Context, Error, MatView, OpReq, Result, RunContext, Shape, TBlob};

use crate::operator::Operator;
use crate::param::FullyConnectedParam;
use crate::symbol::{shape_assign_check, slot_id, AtomicSymbol, BindSymbol};

/// Positional input slots of the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcInput {
    Data = 0,
    Weight = 1,
    Bias = 2,
}

impl FcInput {
    pub const fn idx(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            FcInput::Data => "data",
            FcInput::Weight => "weight",
            FcInput::Bias => "bias",
        }
    }

    fn grad_name(self) -> &'static str {
        match self {
            FcInput::Data => "data_grad",
            FcInput::Weight => "weight_grad",
            FcInput::Bias => "bias_grad",
        }
    }
}

/// The single output slot.
pub const FC_OUTPUT: usize = 0;

const DATA: usize = FcInput::Data.idx();
const WEIGHT: usize = FcInput::Weight.idx();
const BIAS: usize = FcInput::Bias.idx();

fn check_count(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::ArgumentCount {
            what,
            expected,
            got,
        });
    }
    Ok(())
}

fn check_shape(expected: Shape, got: &Shape) -> Result<()> {
    if expected != *got {
        return Err(Error::ShapeMismatch {
            expected,
            got: got.clone(),
        });
    }
    Ok(())
}

fn check_no_alias<B: Backend>(
    dst: (&'static str, &TBlob<B>),
    srcs: &[(&'static str, &TBlob<B>)],
) -> Result<()> {
    for &(name, src) in srcs {
        if dst.1.shares_storage(src) {
            return Err(Error::AliasViolation { dst: dst.0, src: name });
        }
    }
    Ok(())
}

fn check_dtypes<B: Backend>(blobs: &[&TBlob<B>]) -> Result<()> {
    if let Some((first, rest)) = blobs.split_first() {
        for b in rest {
            if b.dtype() != first.dtype() {
                return Err(Error::DTypeMismatch {
                    expected: first.dtype(),
                    got: b.dtype(),
                });
            }
        }
    }
    Ok(())
}

fn mat_shape(v: MatView) -> Shape {
    Shape::from((v.rows, v.cols))
}

// Operator

/// Fully connected operator bound to backend `B`.
pub struct FullyConnectedOp<B: Backend> {
    param: FullyConnectedParam,
    _backend: PhantomData<B>,
}

impl<B: Backend> FullyConnectedOp<B> {
    pub fn new(param: FullyConnectedParam) -> Self {
        FullyConnectedOp {
            param,
            _backend: PhantomData,
        }
    }

    pub fn param(&self) -> &FullyConnectedParam {
        &self.param
    }
}

impl<B: Backend> Operator<B> for FullyConnectedOp<B> {
    fn forward(
        &self,
        _ctx: RunContext<'_, B>,
        in_data: &[TBlob<B>],
        req: &[OpReq],
        out_data: &[TBlob<B>],
    ) -> Result<()> {
        check_count("forward inputs", self.param.num_inputs(), in_data.len())?;
        check_count("forward outputs", 1, out_data.len())?;
        check_count("forward requests", 1, req.len())?;
        if req[FC_OUTPUT] != OpReq::Write {
            return Err(Error::InvalidRequest {
                slot: "output",
                reason: format!("forward output must be written, got {}", req[FC_OUTPUT]),
            });
        }

        let data = &in_data[DATA];
        let weight = &in_data[WEIGHT];
        let bias = if self.param.has_bias() {
            Some(&in_data[BIAS])
        } else {
            None
        };
        let out = &out_data[FC_OUTPUT];

        let dv = data.flat_2d()?;
        let wv = weight.matrix()?;
        let ov = out.flat_2d()?;
        check_shape(Shape::from((self.param.num_hidden(), dv.cols)), weight.shape())?;
        check_shape(Shape::from((dv.rows, wv.rows)), &mat_shape(ov))?;

        let mut blobs = vec![data, weight, out];
        let mut srcs = vec![("data", data), ("weight", weight)];
        if let Some(bias) = bias {
            check_shape(Shape::from(wv.rows), &Shape::from(bias.vector()?))?;
            blobs.push(bias);
            srcs.push(("bias", bias));
        }
        check_dtypes(&blobs)?;
        check_no_alias(("output", out), &srcs)?;

        tracing::trace!(
            num_hidden = self.param.num_hidden(),
            data = %data.shape(),
            bias = bias.is_some(),
            "fully connected forward"
        );

        let d = data.read();
        let w = weight.read();
        let mut o = out.write();
        B::gemm(&d, dv, &w, wv.t(), &mut o, Assign::Write)?;
        if let Some(bias) = bias {
            B::add_row_broadcast(&mut o, ov.rows, ov.cols, &bias.read())?;
        }
        Ok(())
    }

    fn backward(
        &self,
        _ctx: RunContext<'_, B>,
        out_grad: &[TBlob<B>],
        in_data: &[TBlob<B>],
        _out_data: &[TBlob<B>],
        req: &[OpReq],
        in_grad: &[TBlob<B>],
    ) -> Result<()> {
        let expected = self.param.num_inputs();
        check_count("output gradients", 1, out_grad.len())?;
        check_count("backward inputs", expected, in_data.len())?;
        check_count("input gradients", expected, in_grad.len())?;
        check_count("backward requests", expected, req.len())?;

        if req[WEIGHT].is_inplace() {
            return Err(Error::InvalidRequest {
                slot: FcInput::Weight.grad_name(),
                reason: "cannot write weight gradient in place".to_string(),
            });
        }
        if self.param.has_bias() && req[BIAS].is_inplace() {
            return Err(Error::InvalidRequest {
                slot: FcInput::Bias.grad_name(),
                reason: "cannot write bias gradient in place".to_string(),
            });
        }
        if let OpReq::Inplace(src) = req[DATA] {
            if src != DATA {
                return Err(Error::InvalidRequest {
                    slot: FcInput::Data.grad_name(),
                    reason: format!("may only alias input {} (data), not input {}", DATA, src),
                });
            }
        }

        let grad = &out_grad[FC_OUTPUT];
        let data = &in_data[DATA];
        let weight = &in_data[WEIGHT];

        let gv = grad.flat_2d()?;
        let dv = data.flat_2d()?;
        let wv = weight.matrix()?;
        check_shape(Shape::from((self.param.num_hidden(), dv.cols)), weight.shape())?;
        check_shape(Shape::from((dv.rows, wv.rows)), &mat_shape(gv))?;

        let reads = [("out_grad", grad), ("data", data), ("weight", weight)];
        let mut blobs = vec![grad, data, weight];

        // (slot, blob, assign) for every gradient that was asked for.
        let mut writes: Vec<(FcInput, &TBlob<B>, Assign)> = Vec::with_capacity(expected);
        let slots: &[FcInput] = if self.param.has_bias() {
            &[FcInput::Weight, FcInput::Bias, FcInput::Data]
        } else {
            &[FcInput::Weight, FcInput::Data]
        };
        for &slot in slots {
            let Some(assign) = req[slot.idx()].assign() else {
                continue;
            };
            let g = &in_grad[slot.idx()];
            match slot {
                FcInput::Weight => check_shape(mat_shape(wv), g.shape())?,
                FcInput::Bias => check_shape(Shape::from(wv.rows), g.shape())?,
                FcInput::Data => check_shape(mat_shape(dv), &mat_shape(g.flat_2d()?))?,
            }
            writes.push((slot, g, assign));
            blobs.push(g);
        }
        check_dtypes(&blobs)?;

        for (i, &(slot, g, _)) in writes.iter().enumerate() {
            let name = slot.grad_name();
            let inplace_data = slot == FcInput::Data && req[DATA].is_inplace();
            for &(src_name, src) in &reads {
                if inplace_data && src_name == "data" {
                    continue;
                }
                check_no_alias((name, g), &[(src_name, src)])?;
            }
            for &(other, og, _) in &writes[i + 1..] {
                check_no_alias((name, g), &[(other.grad_name(), og)])?;
            }
        }

        tracing::trace!(
            num_hidden = self.param.num_hidden(),
            data = %data.shape(),
            req = ?req,
            "fully connected backward"
        );

        for (slot, g, assign) in writes {
            match slot {
                FcInput::Weight => {
                    let (gr, d) = (grad.read(), data.read());
                    B::gemm(&gr, gv.t(), &d, dv, &mut g.write(), assign)?;
                }
                FcInput::Bias => {
                    B::sum_rows(&grad.read(), gv.rows, gv.cols, &mut g.write(), assign)?;
                }
                FcInput::Data => {
                    let (gr, w) = (grad.read(), weight.read());
                    B::gemm(&gr, gv, &w, wv, &mut g.write(), assign)?;
                }
            }
        }
        Ok(())
    }
}

// Symbol

/// Graph node describing a fully connected layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullyConnectedSymbol {
    param: FullyConnectedParam,
}

impl FullyConnectedSymbol {
    pub const TYPE: &'static str = "FullyConnected";

    pub fn new(param: FullyConnectedParam) -> Self {
        FullyConnectedSymbol { param }
    }

    pub fn param(&self) -> &FullyConnectedParam {
        &self.param
    }
}

impl AtomicSymbol for FullyConnectedSymbol {
    fn list_arguments(&self) -> Vec<String> {
        let mut args = vec![FcInput::Data.name(), FcInput::Weight.name()];
        if self.param.has_bias() {
            args.push(FcInput::Bias.name());
        }
        args.into_iter().map(String::from).collect()
    }

    fn set_param(&mut self, name: &str, value: &str) -> Result<()> {
        self.param.set_param(name, value)
    }

    fn infer_shape(
        &self,
        in_shape: &mut [Option<Shape>],
        out_shape: &mut Vec<Shape>,
    ) -> Result<()> {
        let what = if self.param.has_bias() {
            "input shapes [data, weight, bias]"
        } else {
            "input shapes [data, weight]"
        };
        check_count(what, self.param.num_inputs(), in_shape.len())?;

        let num_hidden = self.param.num_hidden();
        if num_hidden == 0 {
            return Err(Error::InvalidParam {
                name: "num_hidden".to_string(),
                value: "0".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }

        let dshape = match &in_shape[DATA] {
            Some(s) if s.rank() != 0 => s.clone(),
            _ => return Err(Error::UnknownShape { arg: "data" }),
        };
        if dshape.rank() != 4 {
            return Err(Error::RankMismatch {
                expected: 4,
                got: dshape.rank(),
            });
        }

        let features = dshape.dims()[3];
        let wshape = shape_assign_check(&in_shape[WEIGHT], Shape::from((num_hidden, features)))?;
        let bshape = if self.param.has_bias() {
            Some(shape_assign_check(&in_shape[BIAS], Shape::from(num_hidden))?)
        } else {
            None
        };
        let oshape = dshape.with_last_dim(num_hidden)?;

        tracing::debug!(
            data = %dshape,
            weight = %wshape,
            output = %oshape,
            "fully connected shapes inferred"
        );

        in_shape[WEIGHT] = Some(wshape);
        if let Some(bshape) = bshape {
            in_shape[BIAS] = Some(bshape);
        }
        out_shape.clear();
        out_shape.push(oshape);
        Ok(())
    }

    fn copy(&self) -> Box<dyn AtomicSymbol> {
        Box::new(self.clone())
    }

    fn type_string(&self) -> String {
        Self::TYPE.to_string()
    }

    fn declare_backward_dependency(
        &self,
        out_grad: &[usize],
        in_data: &[usize],
        _out_data: &[usize],
    ) -> Result<Vec<usize>> {
        Ok(vec![
            slot_id(out_grad, FC_OUTPUT, "output gradient ids")?,
            slot_id(in_data, DATA, "input ids")?,
            slot_id(in_data, WEIGHT, "input ids")?,
        ])
    }

    fn backward_inplace_option(
        &self,
        _out_grad: &[usize],
        in_data: &[usize],
        _out_data: &[usize],
        in_grad: &[usize],
    ) -> Result<Vec<(usize, usize)>> {
        Ok(vec![(
            slot_id(in_grad, DATA, "input gradient ids")?,
            slot_id(in_data, DATA, "input ids")?,
        )])
    }
}

impl<B: Backend> BindSymbol<B> for FullyConnectedSymbol {
    fn bind(&self, ctx: &Context<B>) -> Result<Box<dyn Operator<B>>> {
        if self.param.num_hidden() == 0 {
            return Err(Error::InvalidParam {
                name: "num_hidden".to_string(),
                value: "0".to_string(),
                reason: "must be set before bind".to_string(),
            });
        }
        tracing::debug!(device = %ctx.name(), param = %self.param, "binding FullyConnected");
        Ok(Box::new(FullyConnectedOp::<B>::new(self.param)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dense_core::DType;
    use dense_cpu::{CpuBackend, CpuBlob, CpuDevice};

    fn blob(data: &[f64], shape: impl Into<Shape>) -> CpuBlob {
        CpuBlob::from_f64_slice(data, shape, DType::F32, &CpuDevice).unwrap()
    }

    fn op(num_hidden: usize, no_bias: bool) -> FullyConnectedOp<CpuBackend> {
        FullyConnectedOp::new(FullyConnectedParam::new(num_hidden, no_bias).unwrap())
    }

    // data [[1,2,3],[4,5,6]], weight [[1,0,0],[0,1,1]], bias [0.5,-1]
    fn layer() -> (CpuBlob, CpuBlob, CpuBlob) {
        (
            blob(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 1, 1, 3)),
            blob(&[1.0, 0.0, 0.0, 0.0, 1.0, 1.0], (2, 3)),
            blob(&[0.5, -1.0], 2usize),
        )
    }

    #[test]
    fn test_infer_shape_example() {
        let sym = FullyConnectedSymbol::new(FullyConnectedParam::new(4, false).unwrap());
        let mut in_shape = vec![Some(Shape::from((2, 1, 1, 3))), None, None];
        let mut out_shape = Vec::new();
        sym.infer_shape(&mut in_shape, &mut out_shape).unwrap();
        assert_eq!(in_shape[1], Some(Shape::from((4, 3))));
        assert_eq!(in_shape[2], Some(Shape::from(4usize)));
        assert_eq!(out_shape, vec![Shape::from((2, 1, 1, 4))]);
    }

    #[test]
    fn test_infer_shape_failure_leaves_arguments_untouched() {
        let sym = FullyConnectedSymbol::new(FullyConnectedParam::new(4, false).unwrap());
        let mut in_shape = vec![Some(Shape::from((2, 1, 1, 3))), None, Some(Shape::from(5usize))];
        let mut out_shape = vec![Shape::from(9usize)];
        let err = sym.infer_shape(&mut in_shape, &mut out_shape).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(in_shape[1], None);
        assert_eq!(out_shape, vec![Shape::from(9usize)]);
    }

    #[test]
    fn test_forward_values() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let (data, weight, bias) = layer();
        let out = CpuBlob::zeros((2, 1, 1, 2), DType::F32, &CpuDevice).unwrap();
        op(2, false)
            .forward(ctx.run_context(), &[data, weight, bias], &[OpReq::Write], &[out.clone()])
            .unwrap();
        assert_eq!(out.to_f64_vec().unwrap(), vec![1.5, 4.0, 4.5, 10.0]);
    }

    #[test]
    fn test_forward_without_bias() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let (data, weight, _) = layer();
        let out = blob(&[7.0; 4], (2, 1, 1, 2));
        op(2, true)
            .forward(ctx.run_context(), &[data, weight], &[OpReq::Write], &[out.clone()])
            .unwrap();
        assert_eq!(out.to_f64_vec().unwrap(), vec![1.0, 5.0, 4.0, 11.0]);
    }

    #[test]
    fn test_forward_rejects_non_write_request() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let (data, weight, bias) = layer();
        let out = CpuBlob::zeros((2, 1, 1, 2), DType::F32, &CpuDevice).unwrap();
        for req in [OpReq::Accumulate, OpReq::Inplace(0), OpReq::Null] {
            let err = op(2, false)
                .forward(
                    ctx.run_context(),
                    &[data.clone(), weight.clone(), bias.clone()],
                    &[req],
                    &[out.clone()],
                )
                .unwrap_err();
            assert!(matches!(err, Error::InvalidRequest { .. }), "{}", req);
        }
    }

    #[test]
    fn test_forward_rejects_bad_shapes() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let (data, _, bias) = layer();
        let out = CpuBlob::zeros((2, 1, 1, 2), DType::F32, &CpuDevice).unwrap();
        let weight = CpuBlob::zeros((2, 4), DType::F32, &CpuDevice).unwrap();
        let err = op(2, false)
            .forward(ctx.run_context(), &[data, weight, bias], &[OpReq::Write], &[out.clone()])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(out.to_f64_vec().unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn test_forward_rejects_output_aliasing_input() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let data = blob(&[1.0, 2.0, 3.0, 4.0], (2, 1, 1, 2));
        let weight = blob(&[1.0, 0.0, 0.0, 1.0], (2, 2));
        let err = op(2, true)
            .forward(ctx.run_context(), &[data.clone(), weight], &[OpReq::Write], &[data])
            .unwrap_err();
        assert!(matches!(err, Error::AliasViolation { dst: "output", src: "data" }));
    }

    #[test]
    fn test_forward_rejects_weight_rows_other_than_num_hidden() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let data = blob(&[1.0, 2.0], (1, 1, 1, 2));
        let weight = blob(&[1.0; 6], (3, 2));
        let out = CpuBlob::zeros((1, 1, 1, 3), DType::F32, &CpuDevice).unwrap();
        let err = op(2, true)
            .forward(ctx.run_context(), &[data, weight], &[OpReq::Write], &[out.clone()])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(out.to_f64_vec().unwrap(), vec![0.0; 3]);
    }

    #[test]
    fn test_backward_rejects_weight_rows_other_than_num_hidden() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let data = blob(&[1.0, 2.0], (1, 1, 1, 2));
        let weight = blob(&[1.0; 6], (3, 2));
        let out_grad = blob(&[1.0; 3], (1, 1, 1, 3));
        let gd = CpuBlob::zeros((1, 1, 1, 2), DType::F32, &CpuDevice).unwrap();
        let gw = CpuBlob::zeros((3, 2), DType::F32, &CpuDevice).unwrap();
        let err = op(2, true)
            .backward(
                ctx.run_context(),
                &[out_grad],
                &[data, weight],
                &[],
                &[OpReq::Write; 2],
                &[gd.clone(), gw.clone()],
            )
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(gw.to_f64_vec().unwrap(), vec![0.0; 6]);
        assert_eq!(gd.to_f64_vec().unwrap(), vec![0.0; 2]);
    }

    fn grads() -> (CpuBlob, CpuBlob, CpuBlob) {
        (
            CpuBlob::zeros((2, 1, 1, 3), DType::F32, &CpuDevice).unwrap(),
            CpuBlob::zeros((2, 3), DType::F32, &CpuDevice).unwrap(),
            CpuBlob::zeros(2usize, DType::F32, &CpuDevice).unwrap(),
        )
    }

    const EXPECTED_GW: [f64; 6] = [13.0, 17.0, 21.0, 18.0, 24.0, 30.0];
    const EXPECTED_GB: [f64; 2] = [4.0, 6.0];
    const EXPECTED_GD: [f64; 6] = [1.0, 2.0, 2.0, 3.0, 4.0, 4.0];

    #[test]
    fn test_backward_values() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let (data, weight, bias) = layer();
        let out_grad = blob(&[1.0, 2.0, 3.0, 4.0], (2, 1, 1, 2));
        let (gd, gw, gb) = grads();
        op(2, false)
            .backward(
                ctx.run_context(),
                &[out_grad],
                &[data, weight, bias],
                &[],
                &[OpReq::Write; 3],
                &[gd.clone(), gw.clone(), gb.clone()],
            )
            .unwrap();
        assert_eq!(gw.to_f64_vec().unwrap(), EXPECTED_GW);
        assert_eq!(gb.to_f64_vec().unwrap(), EXPECTED_GB);
        assert_eq!(gd.to_f64_vec().unwrap(), EXPECTED_GD);
    }

    #[test]
    fn test_backward_inplace_data_grad_matches_write() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let (data, weight, bias) = layer();
        let out_grad = blob(&[1.0, 2.0, 3.0, 4.0], (2, 1, 1, 2));
        let (_, gw, gb) = grads();
        op(2, false)
            .backward(
                ctx.run_context(),
                &[out_grad],
                &[data.clone(), weight, bias],
                &[],
                &[OpReq::Inplace(0), OpReq::Write, OpReq::Write],
                &[data.clone(), gw.clone(), gb],
            )
            .unwrap();
        // The weight gradient still saw the original data.
        assert_eq!(gw.to_f64_vec().unwrap(), EXPECTED_GW);
        assert_eq!(data.to_f64_vec().unwrap(), EXPECTED_GD);
    }

    #[test]
    fn test_backward_accumulate_and_null() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let (data, weight, bias) = layer();
        let out_grad = blob(&[1.0, 2.0, 3.0, 4.0], (2, 1, 1, 2));
        let gd = blob(&[-1.0; 6], (2, 1, 1, 3));
        let gw = blob(&[1.0; 6], (2, 3));
        let gb = blob(&[9.0, 9.0], 2usize);
        op(2, false)
            .backward(
                ctx.run_context(),
                &[out_grad],
                &[data, weight, bias],
                &[],
                &[OpReq::Null, OpReq::Accumulate, OpReq::Null],
                &[gd.clone(), gw.clone(), gb.clone()],
            )
            .unwrap();
        let accumulated: Vec<f64> = EXPECTED_GW.iter().map(|v| v + 1.0).collect();
        assert_eq!(gw.to_f64_vec().unwrap(), accumulated);
        assert_eq!(gd.to_f64_vec().unwrap(), vec![-1.0; 6]);
        assert_eq!(gb.to_f64_vec().unwrap(), vec![9.0, 9.0]);
    }

    #[test]
    fn test_backward_rejects_undeclared_inplace() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let (data, weight, bias) = layer();
        let out_grad = blob(&[1.0, 2.0, 3.0, 4.0], (2, 1, 1, 2));
        let (gd, gw, gb) = grads();
        for req in [
            [OpReq::Write, OpReq::Inplace(1), OpReq::Write],
            [OpReq::Write, OpReq::Write, OpReq::Inplace(2)],
            [OpReq::Inplace(1), OpReq::Write, OpReq::Write],
        ] {
            let err = op(2, false)
                .backward(
                    ctx.run_context(),
                    &[out_grad.clone()],
                    &[data.clone(), weight.clone(), bias.clone()],
                    &[],
                    &req,
                    &[gd.clone(), gw.clone(), gb.clone()],
                )
                .unwrap_err();
            assert!(matches!(err, Error::InvalidRequest { .. }), "{:?}", req);
        }
        assert_eq!(gw.to_f64_vec().unwrap(), vec![0.0; 6]);
    }

    #[test]
    fn test_backward_rejects_unrequested_alias() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let (data, weight, bias) = layer();
        let out_grad = blob(&[1.0, 2.0, 3.0, 4.0], (2, 1, 1, 2));
        let (gd, _, gb) = grads();

        // weight gradient written over the weight itself
        let err = op(2, false)
            .backward(
                ctx.run_context(),
                &[out_grad.clone()],
                &[data.clone(), weight.clone(), bias.clone()],
                &[],
                &[OpReq::Write; 3],
                &[gd, weight.clone(), gb.clone()],
            )
            .unwrap_err();
        assert!(matches!(err, Error::AliasViolation { dst: "weight_grad", src: "weight" }));

        // data gradient aliasing data without saying so
        let (_, gw, _) = grads();
        let err = op(2, false)
            .backward(
                ctx.run_context(),
                &[out_grad],
                &[data.clone(), weight, bias],
                &[],
                &[OpReq::Write; 3],
                &[data.clone(), gw, gb],
            )
            .unwrap_err();
        assert!(matches!(err, Error::AliasViolation { dst: "data_grad", src: "data" }));
        assert_eq!(data.to_f64_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_backward_declarations() {
        let sym = FullyConnectedSymbol::new(FullyConnectedParam::new(4, false).unwrap());
        let deps = sym
            .declare_backward_dependency(&[10], &[20, 21, 22], &[30])
            .unwrap();
        assert_eq!(deps, vec![10, 20, 21]);
        let pairs = sym
            .backward_inplace_option(&[10], &[20, 21, 22], &[30], &[40, 41, 42])
            .unwrap();
        assert_eq!(pairs, vec![(40, 20)]);
        assert!(sym.declare_backward_dependency(&[], &[20, 21], &[]).is_err());
    }

    #[test]
    fn test_copy_is_independent() {
        let mut sym = FullyConnectedSymbol::new(FullyConnectedParam::new(4, false).unwrap());
        let copy = sym.copy();
        sym.set_param("num_hidden", "8").unwrap();
        sym.set_param("no_bias", "true").unwrap();
        assert_eq!(copy.type_string(), "FullyConnected");
        assert_eq!(copy.list_arguments(), vec!["data", "weight", "bias"]);
        assert_eq!(sym.list_arguments(), vec!["data", "weight"]);
        assert_eq!(sym.param().num_hidden(), 8);
    }

    #[test]
    fn test_bind_requires_num_hidden() {
        let ctx = Context::<CpuBackend>::new(CpuDevice);
        let unset = FullyConnectedSymbol::default();
        let bound = BindSymbol::<CpuBackend>::bind(&unset, &ctx);
        assert!(matches!(bound, Err(Error::InvalidParam { .. })));

        let sym = FullyConnectedSymbol::new(FullyConnectedParam::new(2, false).unwrap());
        assert!(BindSymbol::<CpuBackend>::bind(&sym, &ctx).is_ok());
    }
}
